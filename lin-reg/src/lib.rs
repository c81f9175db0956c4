#[macro_use]
extern crate log;

use common::Result;
use nalgebra::{DMatrix, DMatrixView};

mod pseudo_inverse;
mod ridge_readout;
mod softmax;
mod tikhonov_regularization;

pub use pseudo_inverse::PseudoInverse;
pub use ridge_readout::RidgeReadout;
pub use softmax::softmax_rows;
pub use tikhonov_regularization::TikhonovRegularization;

/// Selects how the normal equations of the readout are solved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LearningAlgo {
    /// Direct inverse of the regularized state covariance
    #[default]
    Inverse,
    /// SVD based pseudo-inverse, tolerating rank-deficient state covariance
    PseudoInverse,
}

/// Generic way of performing linear regression and fitting the readout matrix
pub trait LinReg: Clone {
    /// Solve the regularized normal equations `(xtx + ridge * I) * W = xty` for W
    ///
    /// # Parameters
    /// xtx: The accumulated design covariance, d × d
    /// xty: The accumulated design-target cross product, d × O
    fn solve(&self, xtx: &DMatrix<f64>, xty: &DMatrix<f64>) -> Result<DMatrix<f64>>;

    /// Fit a readout matrix, mapping inputs to targets
    ///
    /// # Parameters
    /// design: Input data with one row per datapoint
    /// targets: Target data having O columns as the output dimensionality
    fn fit_readout(
        &self,
        design: &DMatrixView<'_, f64>,
        targets: &DMatrixView<'_, f64>,
    ) -> Result<DMatrix<f64>> {
        self.solve(&design.tr_mul(design), &design.tr_mul(targets))
    }
}
