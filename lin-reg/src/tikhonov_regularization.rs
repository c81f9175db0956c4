use common::{RcError, Result};
use nalgebra::DMatrix;

use super::LinReg;

/// Largest tolerated deviation of `A * inv(A)` from the identity
const INVERSE_RESIDUAL_TOL: f64 = 1e-6;

/// Tikhonov regularization aka ridge regression, solved with a direct inverse.
/// It is particularly useful to mitigate the problem of multicollinearity in
/// linear regression
#[derive(Debug, Clone)]
pub struct TikhonovRegularization {
    /// Ridge parameter
    pub regularization_coeff: f64,
}

impl LinReg for TikhonovRegularization {
    fn solve(&self, xtx: &DMatrix<f64>, xty: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let n = xtx.nrows();
        let reg_m: DMatrix<f64> = DMatrix::from_diagonal_element(n, n, self.regularization_coeff);
        let p0 = xtx + reg_m;

        let p1 = p0.clone().try_inverse().ok_or_else(|| {
            RcError::Singular(format!("{n}x{n} state covariance has no inverse"))
        })?;
        if p1.iter().any(|v| !v.is_finite()) {
            return Err(RcError::Singular(format!(
                "inverse of the {n}x{n} state covariance is not finite"
            )));
        }
        let residual = (&p0 * &p1 - DMatrix::<f64>::identity(n, n)).amax();
        if residual > INVERSE_RESIDUAL_TOL {
            debug!("inverse residual: {}", residual);
            return Err(RcError::Singular(format!(
                "{n}x{n} state covariance is ill-conditioned (inverse residual {residual:e}), \
                 consider the pseudo-inverse or a larger ridge parameter"
            )));
        }

        let w = p1 * xty;
        if w.iter().any(|v| !v.is_finite()) {
            return Err(RcError::NonFinite("readout matrix"));
        }

        Ok(w)
    }
}
