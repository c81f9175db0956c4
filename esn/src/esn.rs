use common::{Activation, RcError, Readout, Reservoir, Result, SequenceBatch};
use lin_reg::RidgeReadout;
use nalgebra::{DMatrix, DVector};

use crate::{ESNCell, Params, Shape, WeightSource};

/// Whether the network collects readout statistics or predicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Forward calls require targets and feed the readout statistics.
    /// Entered on construction and by `reset`.
    Training,
    /// Forward calls forbid targets and return predictions.
    /// Entered by a successful `finalize`.
    Frozen,
}

/// The Echo State Network.
/// Composes a fixed reservoir with a trained linear readout and applies the washout
/// in between.
#[derive(Debug)]
pub struct ESN<C = ESNCell, O = RidgeReadout> {
    cell: C,
    readout: O,
    washout: usize,
    mode: Mode,
}

impl ESN {
    /// Create a new network, resolving the three weight sources in the order
    /// internal, input, bias.
    ///
    /// # Arguments
    /// params: The parameters
    /// w: Source of the hidden_dim × hidden_dim internal weights
    /// w_in: Source of the hidden_dim × input_dim input weights
    /// w_bias: Source of the hidden_dim biases
    pub fn new(
        params: Params,
        w: WeightSource,
        w_in: WeightSource,
        w_bias: WeightSource,
    ) -> Result<Self> {
        params.validate()?;

        let w = w.resolve(Shape::Matrix(params.hidden_dim, params.hidden_dim));
        let w_in = w_in.resolve(Shape::Matrix(params.hidden_dim, params.input_dim));
        let w_bias = w_bias.resolve(Shape::Vector(params.hidden_dim));
        debug!(
            "resolved weights: w {:?}, w_in {:?}, w_bias {:?}",
            w.shape(),
            w_in.shape(),
            w_bias.shape()
        );

        let cell = ESNCell::new(
            params.input_dim,
            params.hidden_dim,
            w,
            w_in,
            w_bias,
            params.spectral_radius,
            params.bias_scaling,
            params.input_scaling,
            params.nonlin_func,
        )?;
        let readout = RidgeReadout::new(
            params.hidden_dim,
            params.output_dim,
            params.ridge_param,
            params.with_bias,
            params.learning_algo,
            params.softmax_output,
        )?;

        Self::from_parts(cell, readout, params.washout)
    }
}

impl<C, O> ESN<C, O>
where
    C: Reservoir,
    O: Readout,
{
    /// Compose a network from any reservoir and readout.
    /// The network starts out in training mode.
    pub fn from_parts(cell: C, readout: O, washout: usize) -> Result<Self> {
        if cell.hidden_dim() != readout.input_dim() {
            return Err(RcError::DimensionMismatch {
                what: "readout input",
                expected: (cell.hidden_dim(), readout.output_dim()),
                got: (readout.input_dim(), readout.output_dim()),
            });
        }

        Ok(Self {
            cell,
            readout,
            washout,
            mode: Mode::Training,
        })
    }

    /// Run the reservoir over `u`, drop the washout and hand the remaining states to the
    /// readout.
    ///
    /// # Arguments
    /// u: Inputs, batch × time × input_dim
    /// y: Targets, batch × time × output_dim. Required in training mode, forbidden when frozen
    /// reset_state: Start every sequence from a zero hidden state
    ///
    /// # Returns
    /// `None` after accumulating statistics in training mode, the predictions of shape
    /// batch × (time - washout) × output_dim when frozen.
    ///
    /// All inputs are validated before the reservoir state is touched, a rejected call
    /// leaves the network as it was.
    pub fn forward(
        &mut self,
        u: &SequenceBatch,
        y: Option<&SequenceBatch>,
        reset_state: bool,
    ) -> Result<Option<SequenceBatch>> {
        match (self.mode, y) {
            (Mode::Training, None) => return Err(RcError::MissingTargets),
            (Mode::Frozen, Some(_)) => return Err(RcError::TargetsInInference),
            _ => {}
        }
        self.validate_inputs(u, y)?;

        let hidden_states = self.cell.compute(u, reset_state)?;
        let states = hidden_states.skip_timesteps(self.washout)?;
        trace!("states after washout: {:?}", states.shape());

        match y {
            Some(y) => {
                let targets = y.skip_timesteps(self.washout)?;
                self.readout.accumulate(&states, &targets)?;
                Ok(None)
            }
            None => Ok(Some(self.readout.predict(&states)?)),
        }
    }

    fn validate_inputs(&self, u: &SequenceBatch, y: Option<&SequenceBatch>) -> Result<()> {
        if u.dim() != self.cell.input_dim() {
            return Err(RcError::DimensionMismatch {
                what: "inputs",
                expected: (u.seq_len(), self.cell.input_dim()),
                got: (u.seq_len(), u.dim()),
            });
        }
        if self.washout >= u.seq_len() {
            return Err(RcError::WashoutTooLong {
                washout: self.washout,
                seq_len: u.seq_len(),
            });
        }
        if u.iter().any(|s| s.iter().any(|v| !v.is_finite())) {
            return Err(RcError::NonFinite("inputs"));
        }

        if let Some(y) = y {
            if y.dim() != self.readout.output_dim() {
                return Err(RcError::DimensionMismatch {
                    what: "targets",
                    expected: (y.seq_len(), self.readout.output_dim()),
                    got: (y.seq_len(), y.dim()),
                });
            }
            if (y.batch_size(), y.seq_len()) != (u.batch_size(), u.seq_len()) {
                return Err(RcError::DimensionMismatch {
                    what: "targets (batch, time)",
                    expected: (u.batch_size(), u.seq_len()),
                    got: (y.batch_size(), y.seq_len()),
                });
            }
            if y.iter().any(|s| s.iter().any(|v| !v.is_finite())) {
                return Err(RcError::NonFinite("targets"));
            }
        }

        Ok(())
    }

    /// Accumulate readout statistics of `u` and `y`, starting from a zero hidden state
    #[inline(always)]
    pub fn train(&mut self, u: &SequenceBatch, y: &SequenceBatch) -> Result<()> {
        self.forward(u, Some(y), true).map(|_| ())
    }

    /// Predict the outputs for `u`, starting from a zero hidden state.
    /// Fails with `NotFinalized` while the network is still training.
    pub fn predict(&mut self, u: &SequenceBatch) -> Result<SequenceBatch> {
        if self.mode == Mode::Training {
            return Err(RcError::NotFinalized);
        }
        self.forward(u, None, true)?.ok_or(RcError::NotFinalized)
    }

    /// Discard the fitted readout and all accumulated statistics and return to training mode.
    /// The reservoir weights and its hidden state are left alone.
    pub fn reset(&mut self) {
        self.readout.reset();
        self.mode = Mode::Training;
    }

    /// Solve the readout from everything accumulated since the last reset and freeze the
    /// network. Finalizing again without a reset solves once more from the same statistics.
    pub fn finalize(&mut self) -> Result<()> {
        self.readout.finalize()?;
        self.mode = Mode::Frozen;

        Ok(())
    }

    /// Reset the reservoir's hidden state, keeping the readout and the mode
    #[inline(always)]
    pub fn reset_hidden(&mut self) {
        self.cell.reset_hidden();
    }

    #[inline(always)]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline(always)]
    pub fn is_training(&self) -> bool {
        self.mode == Mode::Training
    }

    #[inline(always)]
    pub fn washout(&self) -> usize {
        self.washout
    }

    #[inline(always)]
    pub fn spectral_radius(&self) -> f64 {
        self.cell.spectral_radius()
    }

    /// Rescale the internal weights, effective from the next forward call
    pub fn set_spectral_radius(&mut self, spectral_radius: f64) -> Result<()> {
        self.cell.set_spectral_radius(spectral_radius)
    }

    #[inline(always)]
    pub fn bias_scaling(&self) -> f64 {
        self.cell.bias_scaling()
    }

    #[inline(always)]
    pub fn input_scaling(&self) -> f64 {
        self.cell.input_scaling()
    }

    #[inline(always)]
    pub fn nonlin_func(&self) -> Activation {
        self.cell.nonlin_func()
    }

    /// The hidden state after the last processed timestep
    #[inline(always)]
    pub fn hidden(&self) -> &DVector<f64> {
        self.cell.hidden()
    }

    /// Internal weights, scaled to the spectral radius
    #[inline(always)]
    pub fn w(&self) -> &DMatrix<f64> {
        self.cell.w()
    }

    #[inline(always)]
    pub fn w_in(&self) -> &DMatrix<f64> {
        self.cell.w_in()
    }

    /// The fitted readout matrix, `None` before the first finalize and after a reset
    #[inline(always)]
    pub fn w_out(&self) -> Option<&DMatrix<f64>> {
        self.readout.w_out()
    }

    #[inline(always)]
    pub fn cell(&self) -> &C {
        &self.cell
    }

    #[inline(always)]
    pub fn readout(&self) -> &O {
        &self.readout
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use common::ErrorKind;

    use super::*;
    use crate::UniformGenerator;

    /// Reservoir whose hidden state at time t is just t, so the readout input shows
    /// exactly which timesteps survived the washout
    #[derive(Debug)]
    struct ClockReservoir {
        hidden: DVector<f64>,
        w: DMatrix<f64>,
    }

    impl ClockReservoir {
        fn new() -> Self {
            Self {
                hidden: DVector::zeros(1),
                w: DMatrix::zeros(1, 1),
            }
        }
    }

    impl Reservoir for ClockReservoir {
        fn input_dim(&self) -> usize {
            1
        }

        fn hidden_dim(&self) -> usize {
            1
        }

        fn compute(&mut self, inputs: &SequenceBatch, reset_state: bool) -> Result<SequenceBatch> {
            let mut out = Vec::new();
            for u in inputs.iter() {
                if reset_state {
                    self.reset_hidden();
                }
                let start = self.hidden[0];
                let states = DMatrix::from_fn(u.nrows(), 1, |t, _| start + t as f64);
                self.hidden[0] = start + u.nrows() as f64;
                out.push(states);
            }
            SequenceBatch::new(out)
        }

        fn reset_hidden(&mut self) {
            self.hidden.fill(0.0);
        }

        fn spectral_radius(&self) -> f64 {
            0.0
        }

        fn set_spectral_radius(&mut self, _spectral_radius: f64) -> Result<()> {
            Ok(())
        }

        fn bias_scaling(&self) -> f64 {
            1.0
        }

        fn input_scaling(&self) -> f64 {
            1.0
        }

        fn nonlin_func(&self) -> Activation {
            Activation::Identity
        }

        fn hidden(&self) -> &DVector<f64> {
            &self.hidden
        }

        fn w(&self) -> &DMatrix<f64> {
            &self.w
        }

        fn w_in(&self) -> &DMatrix<f64> {
            &self.w
        }
    }

    /// Readout that records every batch it is handed
    #[derive(Debug, Default, Clone)]
    struct RecordingReadout {
        seen_states: Rc<RefCell<Vec<SequenceBatch>>>,
        seen_targets: Rc<RefCell<Vec<SequenceBatch>>>,
        fitted: Option<DMatrix<f64>>,
    }

    impl Readout for RecordingReadout {
        fn input_dim(&self) -> usize {
            1
        }

        fn output_dim(&self) -> usize {
            1
        }

        fn accumulate(&mut self, states: &SequenceBatch, targets: &SequenceBatch) -> Result<()> {
            self.seen_states.borrow_mut().push(states.clone());
            self.seen_targets.borrow_mut().push(targets.clone());
            Ok(())
        }

        fn predict(&self, states: &SequenceBatch) -> Result<SequenceBatch> {
            self.fitted.as_ref().ok_or(RcError::NotFinalized)?;
            self.seen_states.borrow_mut().push(states.clone());
            Ok(states.clone())
        }

        fn finalize(&mut self) -> Result<()> {
            if self.seen_targets.borrow().is_empty() {
                return Err(RcError::NoStatistics);
            }
            self.fitted = Some(DMatrix::from_element(1, 1, 1.0));
            Ok(())
        }

        fn reset(&mut self) {
            self.seen_targets.borrow_mut().clear();
            self.fitted = None;
        }

        fn w_out(&self) -> Option<&DMatrix<f64>> {
            self.fitted.as_ref()
        }
    }

    fn column(vals: &[f64]) -> SequenceBatch {
        SequenceBatch::from_sequence(DMatrix::from_column_slice(vals.len(), 1, vals))
    }

    fn small_esn(washout: usize) -> ESN {
        let mut params = Params::new(1, 10, 1);
        params.washout = washout;
        params.learning_algo = lin_reg::LearningAlgo::PseudoInverse;
        params.ridge_param = 1e-3;
        let shared = crate::SharedGenerator::new(UniformGenerator::new(Some(0), 0.5, 1.0));
        ESN::new(
            params,
            WeightSource::generator(shared.clone()),
            WeightSource::generator(shared.clone()),
            WeightSource::generator(shared),
        )
        .unwrap()
    }

    #[test]
    fn washout_never_reaches_the_readout() {
        let readout = RecordingReadout::default();
        let seen_states = readout.seen_states.clone();
        let seen_targets = readout.seen_targets.clone();
        let mut esn = ESN::from_parts(ClockReservoir::new(), readout, 2).unwrap();

        let u = column(&[0.0; 5]);
        let y = column(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        assert_eq!(esn.forward(&u, Some(&y), true).unwrap(), None);

        assert_eq!(seen_states.borrow()[0], column(&[2.0, 3.0, 4.0]));
        assert_eq!(seen_targets.borrow()[0], column(&[12.0, 13.0, 14.0]));
    }

    #[test]
    fn washout_applies_to_predictions() {
        let mut esn = ESN::from_parts(ClockReservoir::new(), RecordingReadout::default(), 3).unwrap();
        esn.train(&column(&[0.0; 5]), &column(&[0.0; 5])).unwrap();
        esn.finalize().unwrap();

        let preds = esn.predict(&column(&[0.0; 7])).unwrap();
        assert_eq!(preds, column(&[3.0, 4.0, 5.0, 6.0]));
    }

    #[test]
    fn state_continues_without_reset() {
        let readout = RecordingReadout::default();
        let seen_states = readout.seen_states.clone();
        let mut esn = ESN::from_parts(ClockReservoir::new(), readout, 1).unwrap();

        let u = column(&[0.0; 3]);
        esn.forward(&u, Some(&u), true).unwrap();
        esn.forward(&u, Some(&u), false).unwrap();

        assert_eq!(seen_states.borrow()[1], column(&[4.0, 5.0]));
    }

    #[test]
    fn targets_required_while_training() {
        let mut esn = small_esn(0);
        let u = column(&[0.1, 0.2, 0.3]);
        let err = esn.forward(&u, None, true).unwrap_err();
        assert_eq!(err, RcError::MissingTargets);
        assert_eq!(err.kind(), ErrorKind::Mode);
        assert!(esn.hidden().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn targets_forbidden_when_frozen() {
        let mut esn = small_esn(0);
        let u = column(&[0.1, 0.2, 0.3]);
        esn.train(&u, &u).unwrap();
        esn.finalize().unwrap();
        assert_eq!(esn.mode(), Mode::Frozen);

        let before = esn.hidden().clone();
        let err = esn.forward(&u, Some(&u), false).unwrap_err();
        assert_eq!(err, RcError::TargetsInInference);
        assert_eq!(esn.hidden(), &before);
    }

    #[test]
    fn washout_too_long_leaves_state_untouched() {
        let mut esn = small_esn(5);
        let u = column(&[0.1, 0.2, 0.3, 0.4, 0.5]);
        let err = esn.train(&u, &u).unwrap_err();
        assert_eq!(
            err,
            RcError::WashoutTooLong {
                washout: 5,
                seq_len: 5
            }
        );
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(esn.hidden().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn mismatched_targets_rejected() {
        let mut esn = small_esn(0);
        let u = column(&[0.1, 0.2, 0.3]);
        let y = column(&[0.1, 0.2]);
        let err = esn.train(&u, &y).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(esn.readout().n_samples(), 0);
    }

    #[test]
    fn finalize_before_data() {
        let mut esn = small_esn(0);
        assert_eq!(esn.finalize().unwrap_err(), RcError::NoStatistics);
        assert!(esn.is_training());
        assert!(esn.w_out().is_none());

        let u = column(&[0.1, 0.2, 0.3]);
        esn.train(&u, &u).unwrap();
        esn.finalize().unwrap();
        esn.reset();
        assert_eq!(esn.finalize().unwrap_err(), RcError::NoStatistics);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut esn = small_esn(0);
        let u = column(&[0.1, 0.2, 0.3]);
        esn.train(&u, &u).unwrap();
        esn.finalize().unwrap();
        assert!(esn.w_out().is_some());

        esn.reset();
        let once = (esn.mode(), esn.w_out().cloned(), esn.readout().n_samples());
        esn.reset();
        let twice = (esn.mode(), esn.w_out().cloned(), esn.readout().n_samples());

        assert_eq!(once, (Mode::Training, None, 0));
        assert_eq!(once, twice);
    }

    #[test]
    fn second_finalize_is_redundant() {
        let mut esn = small_esn(0);
        let u = column(&[0.1, 0.2, 0.3, 0.4]);
        esn.train(&u, &u).unwrap();
        esn.finalize().unwrap();
        let first = esn.w_out().cloned();
        esn.finalize().unwrap();
        assert_eq!(esn.w_out().cloned(), first);
        assert_eq!(esn.mode(), Mode::Frozen);
    }

    #[test]
    fn reset_hidden_keeps_readout() {
        let mut esn = small_esn(0);
        let u = column(&[0.1, 0.2, 0.3]);
        esn.train(&u, &u).unwrap();
        esn.finalize().unwrap();
        assert!(esn.hidden().iter().any(|v| *v != 0.0));

        esn.reset_hidden();
        assert!(esn.hidden().iter().all(|v| *v == 0.0));
        assert_eq!(esn.mode(), Mode::Frozen);
        assert!(esn.w_out().is_some());
    }

    #[test]
    fn spectral_radius_passthrough() {
        let mut esn = small_esn(0);
        assert_eq!(esn.spectral_radius(), 0.9);
        assert_eq!(esn.bias_scaling(), 1.0);
        assert_eq!(esn.input_scaling(), 1.0);
        assert!(matches!(esn.nonlin_func(), Activation::Tanh));

        esn.set_spectral_radius(0.5).unwrap();
        assert_eq!(esn.spectral_radius(), 0.5);
        let rho = crate::spectral_radius(esn.w());
        assert!((rho - 0.5).abs() / 0.5 < 1e-6, "rho: {}", rho);
    }

    #[test]
    fn mismatched_parts_rejected() {
        let readout = RidgeReadout::new(3, 1, 0.0, true, lin_reg::LearningAlgo::Inverse, false).unwrap();
        let err = ESN::from_parts(ClockReservoir::new(), readout, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn predict_while_training() {
        let mut params = Params::new(1, 4, 1);
        params.learning_algo = lin_reg::LearningAlgo::PseudoInverse;
        let g = || WeightSource::generator(UniformGenerator::new(Some(0), 1.0, 1.0));
        let mut esn = ESN::new(params, g(), g(), g()).unwrap();
        let u = SequenceBatch::from_sequence(DMatrix::from_element(4, 1, 0.5));

        let err = esn.predict(&u).unwrap_err();
        assert_eq!(err, RcError::NotFinalized);
        assert_eq!(err.kind(), ErrorKind::Mode);
        assert!(esn.hidden().iter().all(|v| *v == 0.0));

        esn.train(&u, &u).unwrap();
        esn.finalize().unwrap();
        assert_eq!(esn.predict(&u).unwrap().shape(), (1, 4, 1));
    }

    #[test]
    fn diverging_reservoir_leaves_state_untouched() {
        let cell = ESNCell::new(
            1,
            2,
            DMatrix::identity(2, 2),
            DMatrix::from_element(2, 1, 1.0),
            DMatrix::zeros(2, 1),
            1.0,
            1.0,
            1.0,
            Activation::Custom(|v| v * 1e200),
        )
        .unwrap();
        let readout = RidgeReadout::new(2, 1, 0.0, true, lin_reg::LearningAlgo::Inverse, false).unwrap();
        let mut esn = ESN::from_parts(cell, readout, 0).unwrap();
        let before = esn.hidden().clone();

        let u = SequenceBatch::from_sequence(DMatrix::from_element(3, 1, 1.0));
        let err = esn.forward(&u, Some(&u), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Numerical);
        assert_eq!(esn.hidden(), &before);
        assert_eq!(esn.readout().n_samples(), 0);
    }
}
