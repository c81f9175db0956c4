use thiserror::Error;

/// The three failure families a reservoir computer can run into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed parameters, shapes or washout
    Configuration,
    /// An operation was called in the wrong training mode
    Mode,
    /// The regression could not be solved reliably
    Numerical,
}

/// Every failure of the reservoir computing pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RcError {
    /// A scalar parameter lies outside of its valid range
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// A matrix or batch does not have the shape its consumer requires
    #[error("dimension mismatch for {what}: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        /// The matrix or batch being checked
        what: &'static str,
        /// (rows, cols) that were required
        expected: (usize, usize),
        /// (rows, cols) that were supplied
        got: (usize, usize),
    },

    /// The washout swallows the whole sequence
    #[error("washout of {washout} timesteps leaves nothing of sequences with {seq_len} timesteps")]
    WashoutTooLong {
        /// Configured washout
        washout: usize,
        /// Length of the offending sequences
        seq_len: usize,
    },

    /// A batch without any sequence in it
    #[error("batch contains no sequences")]
    EmptyBatch,

    /// Sequences of one batch disagree in their shape
    #[error("sequence {index} has shape {got:?}, but the batch shape is {expected:?}")]
    RaggedBatch {
        /// Index of the first sequence that disagrees
        index: usize,
        /// (timesteps, dim) of the first sequence
        expected: (usize, usize),
        /// (timesteps, dim) of the offending sequence
        got: (usize, usize),
    },

    /// Targets were passed while the model is frozen
    #[error("targets supplied while the model is frozen")]
    TargetsInInference,

    /// Targets are required while the model is training
    #[error("targets missing while the model is training")]
    MissingTargets,

    /// Finalize was requested before any statistics were accumulated
    #[error("cannot finalize without accumulated statistics")]
    NoStatistics,

    /// Prediction was requested before the readout was ever solved
    #[error("readout has not been finalized yet")]
    NotFinalized,

    /// The readout has been solved and must be reset before accumulating again
    #[error("readout is finalized, reset it before accumulating more statistics")]
    ReadoutFrozen,

    /// The system matrix of the regression is singular or ill-conditioned
    #[error("singular system: {0}")]
    Singular(String),

    /// A computation produced NaN or infinite values
    #[error("non-finite values in {0}")]
    NonFinite(&'static str),
}

impl RcError {
    /// The failure family this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            RcError::InvalidParameter { .. }
            | RcError::DimensionMismatch { .. }
            | RcError::WashoutTooLong { .. }
            | RcError::EmptyBatch
            | RcError::RaggedBatch { .. } => ErrorKind::Configuration,
            RcError::TargetsInInference
            | RcError::MissingTargets
            | RcError::NoStatistics
            | RcError::NotFinalized
            | RcError::ReadoutFrozen => ErrorKind::Mode,
            RcError::Singular(_) | RcError::NonFinite(_) => ErrorKind::Numerical,
        }
    }
}

/// Convenience alias used throughout the workspace
pub type Result<T> = std::result::Result<T, RcError>;
