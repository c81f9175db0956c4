use common::{RcError, Readout, Result, SequenceBatch};
use nalgebra::DMatrix;

use crate::{softmax_rows, LearningAlgo, LinReg, PseudoInverse, TikhonovRegularization};

/// Ridge regression readout.
/// Accumulates the sufficient statistics `XᵀX` and `XᵀY` of all (state, target) rows
/// it is fed while training, and solves for the readout matrix in closed form on finalize.
#[derive(Debug, Clone)]
pub struct RidgeReadout {
    input_dim: usize,
    output_dim: usize,
    ridge_param: f64,
    with_bias: bool,
    learning_algo: LearningAlgo,
    softmax_output: bool,

    xtx: DMatrix<f64>,
    xty: DMatrix<f64>,
    n_samples: usize,
    w_out: Option<DMatrix<f64>>,
    frozen: bool,
}

impl RidgeReadout {
    /// Create a new readout without any statistics
    ///
    /// # Arguments:
    /// input_dim: Dimension of the reservoir states
    /// output_dim: Dimension of the targets
    /// ridge_param: Ridge regularization, 0 for ordinary least squares
    /// with_bias: Prepend a constant 1 to every state so the readout learns an offset
    /// learning_algo: How the normal equations are solved
    /// softmax_output: Normalize every predicted row with softmax
    pub fn new(
        input_dim: usize,
        output_dim: usize,
        ridge_param: f64,
        with_bias: bool,
        learning_algo: LearningAlgo,
        softmax_output: bool,
    ) -> Result<Self> {
        if input_dim == 0 {
            return Err(RcError::InvalidParameter {
                name: "input_dim",
                reason: "must be positive".to_string(),
            });
        }
        if output_dim == 0 {
            return Err(RcError::InvalidParameter {
                name: "output_dim",
                reason: "must be positive".to_string(),
            });
        }
        if !ridge_param.is_finite() || ridge_param < 0.0 {
            return Err(RcError::InvalidParameter {
                name: "ridge_param",
                reason: format!("must be finite and non-negative, got {ridge_param}"),
            });
        }

        let design_cols = Self::design_cols(input_dim, with_bias);

        Ok(Self {
            input_dim,
            output_dim,
            ridge_param,
            with_bias,
            learning_algo,
            softmax_output,
            xtx: DMatrix::zeros(design_cols, design_cols),
            xty: DMatrix::zeros(design_cols, output_dim),
            n_samples: 0,
            w_out: None,
            frozen: false,
        })
    }

    #[inline(always)]
    fn design_cols(input_dim: usize, with_bias: bool) -> usize {
        if with_bias {
            input_dim + 1
        } else {
            input_dim
        }
    }

    /// Build the design matrix of one sequence, with a leading column of 1s if a bias is used
    fn design(&self, states: &DMatrix<f64>) -> DMatrix<f64> {
        if !self.with_bias {
            return states.clone();
        }
        let mut design: DMatrix<f64> = DMatrix::from_element(states.nrows(), self.input_dim + 1, 1.0);
        design.columns_mut(1, self.input_dim).copy_from(states);

        design
    }

    fn check_dim(&self, batch: &SequenceBatch, what: &'static str, dim: usize) -> Result<()> {
        if batch.dim() != dim {
            return Err(RcError::DimensionMismatch {
                what,
                expected: (batch.seq_len(), dim),
                got: (batch.seq_len(), batch.dim()),
            });
        }
        Ok(())
    }

    /// The ridge regularization parameter
    #[inline(always)]
    pub fn ridge_param(&self) -> f64 {
        self.ridge_param
    }

    /// Whether the readout learns an offset
    #[inline(always)]
    pub fn with_bias(&self) -> bool {
        self.with_bias
    }

    /// How the normal equations are solved
    #[inline(always)]
    pub fn learning_algo(&self) -> LearningAlgo {
        self.learning_algo
    }

    /// Whether the predictions are softmax normalized
    #[inline(always)]
    pub fn softmax_output(&self) -> bool {
        self.softmax_output
    }

    /// Number of (state, target) rows accumulated since the last reset
    #[inline(always)]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Whether a readout matrix is fitted and no further statistics are accepted
    #[inline(always)]
    pub fn is_finalized(&self) -> bool {
        self.frozen
    }
}

impl Readout for RidgeReadout {
    #[inline(always)]
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline(always)]
    fn output_dim(&self) -> usize {
        self.output_dim
    }

    fn accumulate(&mut self, states: &SequenceBatch, targets: &SequenceBatch) -> Result<()> {
        if self.frozen {
            return Err(RcError::ReadoutFrozen);
        }
        self.check_dim(states, "readout states", self.input_dim)?;
        self.check_dim(targets, "readout targets", self.output_dim)?;
        if states.batch_size() != targets.batch_size() || states.seq_len() != targets.seq_len() {
            return Err(RcError::DimensionMismatch {
                what: "targets (batch, time)",
                expected: (states.batch_size(), states.seq_len()),
                got: (targets.batch_size(), targets.seq_len()),
            });
        }
        if states.iter().any(|s| s.iter().any(|v| !v.is_finite())) {
            return Err(RcError::NonFinite("readout states"));
        }
        if targets.iter().any(|t| t.iter().any(|v| !v.is_finite())) {
            return Err(RcError::NonFinite("readout targets"));
        }

        for (s, t) in states.iter().zip(targets.iter()) {
            let design = self.design(s);
            self.xtx += design.tr_mul(&design);
            self.xty += design.tr_mul(t);
            self.n_samples += s.nrows();
        }
        debug!(
            "accumulated {} rows, {} in total",
            states.batch_size() * states.seq_len(),
            self.n_samples
        );

        Ok(())
    }

    fn predict(&self, states: &SequenceBatch) -> Result<SequenceBatch> {
        let w_out = self.w_out.as_ref().ok_or(RcError::NotFinalized)?;
        self.check_dim(states, "readout states", self.input_dim)?;

        let outputs = states
            .iter()
            .map(|s| {
                let mut out = self.design(s) * w_out;
                if self.softmax_output {
                    softmax_rows(&mut out);
                }
                out
            })
            .collect();

        SequenceBatch::new(outputs)
    }

    fn finalize(&mut self) -> Result<()> {
        if self.n_samples == 0 {
            return Err(RcError::NoStatistics);
        }
        if self.frozen {
            warn!("readout already finalized, solving again from the same {} rows", self.n_samples);
        }

        let w_out = match self.learning_algo {
            LearningAlgo::Inverse => TikhonovRegularization {
                regularization_coeff: self.ridge_param,
            }
            .solve(&self.xtx, &self.xty)?,
            LearningAlgo::PseudoInverse => PseudoInverse {
                regularization_coeff: self.ridge_param,
            }
            .solve(&self.xtx, &self.xty)?,
        };
        info!(
            "readout dims: ({}, {}) fitted on {} rows",
            w_out.nrows(),
            w_out.ncols(),
            self.n_samples
        );
        self.w_out = Some(w_out);
        self.frozen = true;

        Ok(())
    }

    fn reset(&mut self) {
        self.xtx.fill(0.0);
        self.xty.fill(0.0);
        self.n_samples = 0;
        self.w_out = None;
        self.frozen = false;
    }

    #[inline(always)]
    fn w_out(&self) -> Option<&DMatrix<f64>> {
        self.w_out.as_ref()
    }
}
