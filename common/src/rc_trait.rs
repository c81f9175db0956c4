use nalgebra::{DMatrix, DVector};

use crate::{Activation, Result, SequenceBatch};

/// The untrained recurrent part of a reservoir computer.
/// It owns the fixed weight matrices and advances the hidden state over input sequences.
pub trait Reservoir {
    /// Dimension of the inputs fed to the reservoir
    fn input_dim(&self) -> usize;

    /// The number of inner nodes (`neurons`) in the network
    fn hidden_dim(&self) -> usize;

    /// Drive the reservoir over every sequence of `inputs` and return the hidden state
    /// trajectory with shape batch × time × hidden_dim.
    ///
    /// # Arguments:
    /// inputs: batch × time × input_dim
    /// reset_state: whether the hidden state starts from zero for each sequence
    fn compute(&mut self, inputs: &SequenceBatch, reset_state: bool) -> Result<SequenceBatch>;

    /// Reset the hidden state to its initial value
    fn reset_hidden(&mut self);

    /// The spectral radius the internal weights are scaled to
    fn spectral_radius(&self) -> f64;

    /// Rescale the internal weights to a new spectral radius
    fn set_spectral_radius(&mut self, spectral_radius: f64) -> Result<()>;

    /// Multiplicative factor of the bias
    fn bias_scaling(&self) -> f64;

    /// Multiplicative factor of the input weights
    fn input_scaling(&self) -> f64;

    /// The elementwise nonlinearity of the state update
    fn nonlin_func(&self) -> Activation;

    /// The current hidden state
    fn hidden(&self) -> &DVector<f64>;

    /// The internal weights as used in the state update
    fn w(&self) -> &DMatrix<f64>;

    /// The input weights
    fn w_in(&self) -> &DMatrix<f64>;
}

/// The trained linear part of a reservoir computer.
/// While training it accumulates statistics, `finalize` solves for the readout matrix
/// and afterwards it predicts.
pub trait Readout {
    /// Dimension of the states mapped by the readout
    fn input_dim(&self) -> usize;

    /// Dimension of the produced outputs
    fn output_dim(&self) -> usize;

    /// Accumulate the statistics of matching (state, target) pairs
    fn accumulate(&mut self, states: &SequenceBatch, targets: &SequenceBatch) -> Result<()>;

    /// Map states to outputs with the fitted readout matrix
    fn predict(&self, states: &SequenceBatch) -> Result<SequenceBatch>;

    /// Solve for the readout matrix using all statistics accumulated since the last reset
    fn finalize(&mut self) -> Result<()>;

    /// Discard the accumulated statistics and the fitted readout matrix
    fn reset(&mut self);

    /// The fitted readout matrix, `None` before the first finalize
    fn w_out(&self) -> Option<&DMatrix<f64>>;
}
