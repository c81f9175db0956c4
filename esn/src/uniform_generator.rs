use nalgebra::DMatrix;
use nanorand::{Rng, WyRand};

use crate::{MatrixGenerator, Shape};

/// Generates sparse weights, uniformly distributed in [-scale, scale]
#[derive(Debug, Clone)]
pub struct UniformGenerator {
    /// Probability of an entry being non-zero
    connectivity: f64,

    /// Scales the randomly generated weights
    scale: f64,

    rng: WyRand,
}

impl UniformGenerator {
    /// Create a new uniform generator
    ///
    /// # Arguments
    /// seed: Optional seed, making the generated weights reproducible
    /// connectivity: Probability of an entry being non-zero, in [0, 1]
    /// scale: Half-width of the interval the non-zero entries are drawn from
    pub fn new(seed: Option<u64>, connectivity: f64, scale: f64) -> Self {
        let rng = match seed {
            Some(seed) => WyRand::new_seed(seed),
            None => WyRand::new(),
        };

        Self {
            connectivity,
            scale,
            rng,
        }
    }
}

impl MatrixGenerator for UniformGenerator {
    fn generate(&mut self, shape: Shape) -> DMatrix<f64> {
        let (rows, cols) = shape.dims();
        DMatrix::from_fn(rows, cols, |_, _| {
            if self.rng.generate::<f64>() < self.connectivity {
                (self.rng.generate::<f64>() * 2.0 - 1.0) * self.scale
            } else {
                0.0
            }
        })
    }
}
