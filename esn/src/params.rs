use common::{Activation, RcError, Result};
use lin_reg::LearningAlgo;

/// The parameters of the Echo State Network
#[derive(Debug, Clone)]
pub struct Params {
    /// Dimension of the input signal
    pub input_dim: usize,
    /// Number of nodes in the reservoir
    pub hidden_dim: usize,
    /// Dimension of the output signal
    pub output_dim: usize,

    /// Controls the retention of information from previous time steps.
    /// The spectral radius determines how fast the influence of an input
    /// dies out in a reservoir with time, and how stable the reservoir
    /// activations are. The spectral radius should be greater in tasks
    /// requiring longer memory of the input.
    pub spectral_radius: f64,
    /// Scales the reservoir biases
    pub bias_scaling: f64,
    /// Scales the input weight matrix
    pub input_scaling: f64,
    /// Activation function of reservoir state transition
    pub nonlin_func: Activation,

    /// How the readout regression is solved
    pub learning_algo: LearningAlgo,
    /// Ridge regression regulazation applied in training, 0 for ordinary least squares
    pub ridge_param: f64,
    /// Learn an offset in the readout
    pub with_bias: bool,
    /// Normalize the outputs with softmax
    pub softmax_output: bool,

    /// Number of initial timesteps of every sequence to disregard in training and output
    pub washout: usize,
}

impl Params {
    /// Parameters with the given dimensions and the usual defaults for everything else
    pub fn new(input_dim: usize, hidden_dim: usize, output_dim: usize) -> Self {
        Self {
            input_dim,
            hidden_dim,
            output_dim,
            spectral_radius: 0.9,
            bias_scaling: 1.0,
            input_scaling: 1.0,
            nonlin_func: Activation::Tanh,
            learning_algo: LearningAlgo::Inverse,
            ridge_param: 0.0,
            with_bias: true,
            softmax_output: false,
            washout: 0,
        }
    }

    /// Check the parameters for values that can't describe a working network
    pub fn validate(&self) -> Result<()> {
        for (name, dim) in [
            ("input_dim", self.input_dim),
            ("hidden_dim", self.hidden_dim),
            ("output_dim", self.output_dim),
        ] {
            if dim == 0 {
                return Err(RcError::InvalidParameter {
                    name,
                    reason: "must be positive".to_string(),
                });
            }
        }
        for (name, val) in [
            ("spectral_radius", self.spectral_radius),
            ("bias_scaling", self.bias_scaling),
            ("input_scaling", self.input_scaling),
        ] {
            if !val.is_finite() {
                return Err(RcError::InvalidParameter {
                    name,
                    reason: format!("must be finite, got {val}"),
                });
            }
        }
        if !self.ridge_param.is_finite() || self.ridge_param < 0.0 {
            return Err(RcError::InvalidParameter {
                name: "ridge_param",
                reason: format!("must be finite and non-negative, got {}", self.ridge_param),
            });
        }

        Ok(())
    }
}
