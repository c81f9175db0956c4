use nalgebra::DMatrix;
use nanorand::{Rng, WyRand};

use crate::{MatrixGenerator, Shape};

/// Generates the internal weights of an Euler state network, `(W - Wᵀ) - γI`,
/// whose eigenvalues all have the real part `-γ`.
/// Shapes that are not square get plain uniform weights.
#[derive(Debug, Clone)]
pub struct AntisymmetricGenerator {
    rng: WyRand,
    weight_scaling: f64,

    /// diffusion coeffient used for stabilizing the discrete forward
    /// propagation
    gamma: f64,
}

impl AntisymmetricGenerator {
    pub fn new(seed: Option<u64>, weight_scaling: f64, gamma: f64) -> Self {
        let rng = match seed {
            Some(seed) => WyRand::new_seed(seed),
            None => WyRand::new(),
        };

        Self {
            rng,
            weight_scaling,
            gamma,
        }
    }
}

impl MatrixGenerator for AntisymmetricGenerator {
    fn generate(&mut self, shape: Shape) -> DMatrix<f64> {
        let (rows, cols) = shape.dims();
        let weights: DMatrix<f64> = DMatrix::from_fn(rows, cols, |_, _| {
            (self.rng.generate::<f64>() * 2.0 - 1.0) * self.weight_scaling
        });
        if rows != cols {
            return weights;
        }

        let identity_m: DMatrix<f64> = DMatrix::from_diagonal_element(rows, cols, 1.0);
        // This satisfies the constraint of being anti-symmetric
        (&weights - weights.transpose()) - (self.gamma * identity_m)
    }
}
