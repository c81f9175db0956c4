use common::{RcError, Result};
use nalgebra::DMatrix;

use super::LinReg;

/// Singular values below this fraction of the largest one are treated as zero
const PINV_RCOND: f64 = 1e-12;

/// Ridge regression solved through the SVD based Moore-Penrose pseudo-inverse.
/// Slower than a direct inverse, but well defined for rank-deficient state covariance.
#[derive(Debug, Clone)]
pub struct PseudoInverse {
    /// Ridge parameter
    pub regularization_coeff: f64,
}

impl LinReg for PseudoInverse {
    fn solve(&self, xtx: &DMatrix<f64>, xty: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let n = xtx.nrows();
        let reg_m: DMatrix<f64> = DMatrix::from_diagonal_element(n, n, self.regularization_coeff);
        let p0 = xtx + reg_m;
        if p0.iter().any(|v| !v.is_finite()) {
            return Err(RcError::NonFinite("state covariance"));
        }

        let svd = p0.svd(true, true);
        let eps = svd.singular_values.max() * PINV_RCOND;
        trace!("singular values: {}", svd.singular_values);
        let p1 = svd.pseudo_inverse(eps).map_err(|e| RcError::Singular(e.to_string()))?;

        let w = p1 * xty;
        if w.iter().any(|v| !v.is_finite()) {
            return Err(RcError::NonFinite("readout matrix"));
        }

        Ok(w)
    }
}
