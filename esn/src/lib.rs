#[macro_use]
extern crate log;

mod antisymmetric_generator;
mod esn;
mod esn_cell;
mod matrix_generator;
mod normal_generator;
mod params;
mod uniform_generator;

pub use antisymmetric_generator::AntisymmetricGenerator;
pub use esn::{Mode, ESN};
pub use esn_cell::{spectral_radius, ESNCell};
pub use matrix_generator::{MatrixGenerator, Shape, SharedGenerator, WeightSource};
pub use normal_generator::NormalGenerator;
pub use params::Params;
pub use uniform_generator::UniformGenerator;

pub use common::{Activation, ErrorKind, RcError, Readout, Reservoir, Result, SequenceBatch};
pub use lin_reg::{LearningAlgo, RidgeReadout};
