use std::f64::consts::TAU;

use nalgebra::DMatrix;
use nanorand::{Rng, WyRand};

use crate::{MatrixGenerator, Shape};

/// Generates sparse, normally distributed weights
#[derive(Debug, Clone)]
pub struct NormalGenerator {
    connectivity: f64,
    mean: f64,
    std: f64,
    rng: WyRand,
}

impl NormalGenerator {
    /// Create a new generator drawing non-zero entries from N(mean, std²)
    pub fn new(seed: Option<u64>, connectivity: f64, mean: f64, std: f64) -> Self {
        let rng = match seed {
            Some(seed) => WyRand::new_seed(seed),
            None => WyRand::new(),
        };

        Self {
            connectivity,
            mean,
            std,
            rng,
        }
    }

    /// Box-Muller transform of two uniform draws
    fn sample(&mut self) -> f64 {
        // shift to (0, 1] so the logarithm stays finite
        let u1 = 1.0 - self.rng.generate::<f64>();
        let u2 = self.rng.generate::<f64>();
        let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();

        self.mean + self.std * z
    }
}

impl MatrixGenerator for NormalGenerator {
    fn generate(&mut self, shape: Shape) -> DMatrix<f64> {
        let (rows, cols) = shape.dims();
        let mut m: DMatrix<f64> = DMatrix::zeros(rows, cols);
        for v in m.iter_mut() {
            if self.rng.generate::<f64>() < self.connectivity {
                *v = self.sample();
            }
        }

        m
    }
}
