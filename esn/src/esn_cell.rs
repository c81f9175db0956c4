use common::{Activation, RcError, Reservoir, Result, SequenceBatch};
use nalgebra::{DMatrix, DVector};
use num::Complex;

/// The largest eigenvalue magnitude of a square matrix
pub fn spectral_radius(m: &DMatrix<f64>) -> f64 {
    if m.is_empty() {
        return 0.0;
    }
    m.complex_eigenvalues().iter().map(|c: &Complex<f64>| c.norm()).fold(0.0, f64::max)
}

/// The recurrent cell of an Echo State Network.
/// Holds the fixed weights and advances the hidden state
/// `x_t = f(W x_{t-1} + input_scaling * W_in u_t + bias_scaling * w_bias)`.
#[derive(Debug, Clone)]
pub struct ESNCell {
    input_dim: usize,
    hidden_dim: usize,

    /// Internal weights exactly as they were supplied
    w_raw: DMatrix<f64>,
    /// Spectral radius of `w_raw`
    raw_radius: f64,
    /// `w_raw` scaled to `spectral_radius`
    w: DMatrix<f64>,
    w_in: DMatrix<f64>,
    w_bias: DMatrix<f64>,

    spectral_radius: f64,
    bias_scaling: f64,
    input_scaling: f64,
    nonlin_func: Activation,

    hidden: DVector<f64>,
}

impl ESNCell {
    /// Create a new cell from already resolved weights
    ///
    /// # Arguments
    /// w: hidden_dim × hidden_dim internal weights
    /// w_in: hidden_dim × input_dim input weights
    /// w_bias: hidden_dim × 1 biases
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input_dim: usize,
        hidden_dim: usize,
        w: DMatrix<f64>,
        w_in: DMatrix<f64>,
        w_bias: DMatrix<f64>,
        spectral_radius: f64,
        bias_scaling: f64,
        input_scaling: f64,
        nonlin_func: Activation,
    ) -> Result<Self> {
        if input_dim == 0 || hidden_dim == 0 {
            return Err(RcError::InvalidParameter {
                name: if input_dim == 0 { "input_dim" } else { "hidden_dim" },
                reason: "must be positive".to_string(),
            });
        }
        check_shape("internal weights", &w, (hidden_dim, hidden_dim))?;
        check_shape("input weights", &w_in, (hidden_dim, input_dim))?;
        check_shape("bias weights", &w_bias, (hidden_dim, 1))?;
        for (name, m) in [("internal weights", &w), ("input weights", &w_in), ("bias weights", &w_bias)] {
            if m.iter().any(|v| !v.is_finite()) {
                return Err(RcError::NonFinite(name));
            }
        }
        check_finite("spectral_radius", spectral_radius)?;
        check_finite("bias_scaling", bias_scaling)?;
        check_finite("input_scaling", input_scaling)?;

        let raw_radius = self::spectral_radius(&w);
        if raw_radius == 0.0 {
            warn!("internal weights have a spectral radius of 0, they can't be rescaled");
        }
        let w_scaled = scale_to_radius(&w, raw_radius, spectral_radius);
        debug!(
            "reservoir: {} inputs, {} nodes, raw spectral radius {} scaled to {}",
            input_dim, hidden_dim, raw_radius, spectral_radius
        );
        trace!("w: {}\nw_in: {}\nw_bias: {}", w_scaled, w_in, w_bias);

        Ok(Self {
            input_dim,
            hidden_dim,
            w_raw: w,
            raw_radius,
            w: w_scaled,
            w_in,
            w_bias,
            spectral_radius,
            bias_scaling,
            input_scaling,
            nonlin_func,
            hidden: DVector::zeros(hidden_dim),
        })
    }

    /// The internal weights as they were supplied, before spectral radius scaling
    #[inline(always)]
    pub fn w_raw(&self) -> &DMatrix<f64> {
        &self.w_raw
    }

    /// The unscaled biases
    #[inline(always)]
    pub fn w_bias(&self) -> &DMatrix<f64> {
        &self.w_bias
    }

    /// The state following `hidden` after one input
    fn step(&self, hidden: &DVector<f64>, u_t: &DVector<f64>, bias: &DVector<f64>) -> DVector<f64> {
        let mut x: DVector<f64> =
            &self.w * hidden + (&self.w_in * u_t) * self.input_scaling + bias;
        self.nonlin_func.activate(x.as_mut_slice());

        x
    }
}

fn check_shape(what: &'static str, m: &DMatrix<f64>, expected: (usize, usize)) -> Result<()> {
    if m.shape() != expected {
        return Err(RcError::DimensionMismatch {
            what,
            expected,
            got: m.shape(),
        });
    }
    Ok(())
}

fn check_finite(name: &'static str, val: f64) -> Result<()> {
    if !val.is_finite() {
        return Err(RcError::InvalidParameter {
            name,
            reason: format!("must be finite, got {val}"),
        });
    }
    Ok(())
}

fn scale_to_radius(w: &DMatrix<f64>, raw_radius: f64, spectral_radius: f64) -> DMatrix<f64> {
    if raw_radius == 0.0 {
        return w.clone();
    }
    w * (spectral_radius / raw_radius)
}

impl Reservoir for ESNCell {
    #[inline(always)]
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline(always)]
    fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    fn compute(&mut self, inputs: &SequenceBatch, reset_state: bool) -> Result<SequenceBatch> {
        if inputs.dim() != self.input_dim {
            return Err(RcError::DimensionMismatch {
                what: "reservoir inputs",
                expected: (inputs.seq_len(), self.input_dim),
                got: (inputs.seq_len(), inputs.dim()),
            });
        }
        if inputs.iter().any(|u| u.iter().any(|v| !v.is_finite())) {
            return Err(RcError::NonFinite("reservoir inputs"));
        }

        // the state is committed only once the whole batch ran finite
        let bias: DVector<f64> = self.w_bias.column(0) * self.bias_scaling;
        let mut hidden = self.hidden.clone();
        let mut trajectories = Vec::with_capacity(inputs.batch_size());
        for u in inputs.iter() {
            if reset_state {
                hidden.fill(0.0);
            }
            let mut states: DMatrix<f64> = DMatrix::zeros(u.nrows(), self.hidden_dim);
            for (t, u_t) in u.row_iter().enumerate() {
                hidden = self.step(&hidden, &u_t.transpose(), &bias);
                if hidden.iter().any(|v| !v.is_finite()) {
                    debug!("reservoir diverged at timestep {}", t);
                    return Err(RcError::NonFinite("reservoir states"));
                }
                states.set_row(t, &hidden.transpose());
            }
            trajectories.push(states);
        }
        let trajectories = SequenceBatch::new(trajectories)?;
        self.hidden = hidden;

        Ok(trajectories)
    }

    #[inline(always)]
    fn reset_hidden(&mut self) {
        self.hidden.fill(0.0);
    }

    #[inline(always)]
    fn spectral_radius(&self) -> f64 {
        self.spectral_radius
    }

    fn set_spectral_radius(&mut self, spectral_radius: f64) -> Result<()> {
        check_finite("spectral_radius", spectral_radius)?;
        if self.raw_radius == 0.0 {
            warn!("internal weights have a spectral radius of 0, they can't be rescaled");
        }
        self.w = scale_to_radius(&self.w_raw, self.raw_radius, spectral_radius);
        self.spectral_radius = spectral_radius;

        Ok(())
    }

    #[inline(always)]
    fn bias_scaling(&self) -> f64 {
        self.bias_scaling
    }

    #[inline(always)]
    fn input_scaling(&self) -> f64 {
        self.input_scaling
    }

    #[inline(always)]
    fn nonlin_func(&self) -> Activation {
        self.nonlin_func
    }

    #[inline(always)]
    fn hidden(&self) -> &DVector<f64> {
        &self.hidden
    }

    #[inline(always)]
    fn w(&self) -> &DMatrix<f64> {
        &self.w
    }

    #[inline(always)]
    fn w_in(&self) -> &DMatrix<f64> {
        &self.w_in
    }
}
