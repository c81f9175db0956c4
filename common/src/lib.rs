//! This crate provides common funcionality shared by the reservoir computing crates

#![deny(unused_imports, unused_crate_dependencies)]
#![warn(missing_docs)]

mod activation;
mod batch;
mod error;
mod rc_trait;

pub use activation::Activation;
pub use batch::SequenceBatch;
pub use error::{ErrorKind, RcError, Result};
pub use rc_trait::{Readout, Reservoir};
