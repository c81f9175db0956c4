use nalgebra::DMatrix;

use crate::{RcError, Result};

/// A non-empty batch of equally shaped sequences.
/// Every sequence is a matrix with one row per timestep and one column per feature,
/// so a batch reads as batch × time × dim.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceBatch {
    sequences: Vec<DMatrix<f64>>,
}

impl SequenceBatch {
    /// Create a batch, checking that it is non-empty and that all sequences share one shape
    pub fn new(sequences: Vec<DMatrix<f64>>) -> Result<Self> {
        let expected = sequences.first().ok_or(RcError::EmptyBatch)?.shape();
        if let Some((index, seq)) =
            sequences.iter().enumerate().find(|(_, s)| s.shape() != expected)
        {
            return Err(RcError::RaggedBatch {
                index,
                expected,
                got: seq.shape(),
            });
        }

        Ok(Self { sequences })
    }

    /// A batch holding a single sequence
    pub fn from_sequence(sequence: DMatrix<f64>) -> Self {
        Self {
            sequences: vec![sequence],
        }
    }

    /// Number of sequences in the batch
    #[inline(always)]
    pub fn batch_size(&self) -> usize {
        self.sequences.len()
    }

    /// Number of timesteps of every sequence
    #[inline(always)]
    pub fn seq_len(&self) -> usize {
        self.sequences.first().map_or(0, |s| s.nrows())
    }

    /// Feature dimension of every timestep
    #[inline(always)]
    pub fn dim(&self) -> usize {
        self.sequences.first().map_or(0, |s| s.ncols())
    }

    /// (batch, time, dim)
    #[inline(always)]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.batch_size(), self.seq_len(), self.dim())
    }

    /// All sequences of the batch
    #[inline(always)]
    pub fn sequences(&self) -> &[DMatrix<f64>] {
        &self.sequences
    }

    /// The sequence at `idx`, if there is one
    #[inline(always)]
    pub fn sequence(&self, idx: usize) -> Option<&DMatrix<f64>> {
        self.sequences.get(idx)
    }

    /// Iterate over the sequences
    pub fn iter(&self) -> impl Iterator<Item = &DMatrix<f64>> {
        self.sequences.iter()
    }

    /// Unwrap into the owned sequences
    pub fn into_sequences(self) -> Vec<DMatrix<f64>> {
        self.sequences
    }

    /// Drop the first `n` timesteps of every sequence.
    /// At least one timestep has to survive, otherwise `WashoutTooLong` is returned.
    pub fn skip_timesteps(&self, n: usize) -> Result<Self> {
        let seq_len = self.seq_len();
        if n >= seq_len {
            return Err(RcError::WashoutTooLong {
                washout: n,
                seq_len,
            });
        }

        Ok(Self {
            sequences: self
                .sequences
                .iter()
                .map(|s| s.rows(n, seq_len - n).into_owned())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, dim: usize) -> DMatrix<f64> {
        DMatrix::from_fn(len, dim, |i, j| (i * dim + j) as f64)
    }

    #[test]
    fn batch_shape() {
        let batch = SequenceBatch::new(vec![ramp(5, 2), ramp(5, 2), ramp(5, 2)]).unwrap();
        assert_eq!(batch.shape(), (3, 5, 2));
    }

    #[test]
    fn empty_batch_rejected() {
        assert_eq!(SequenceBatch::new(vec![]), Err(RcError::EmptyBatch));
    }

    #[test]
    fn ragged_batch_rejected() {
        let err = SequenceBatch::new(vec![ramp(5, 2), ramp(4, 2)]).unwrap_err();
        assert_eq!(
            err,
            RcError::RaggedBatch {
                index: 1,
                expected: (5, 2),
                got: (4, 2)
            }
        );
    }

    #[test]
    fn skip_timesteps_drops_leading_rows() {
        let batch = SequenceBatch::from_sequence(ramp(5, 1));
        let trimmed = batch.skip_timesteps(2).unwrap();
        assert_eq!(trimmed.shape(), (1, 3, 1));
        assert_eq!(trimmed.sequence(0).unwrap().as_slice(), &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn skip_whole_sequence_is_an_error() {
        let batch = SequenceBatch::from_sequence(ramp(5, 1));
        assert_eq!(
            batch.skip_timesteps(5),
            Err(RcError::WashoutTooLong {
                washout: 5,
                seq_len: 5
            })
        );
    }
}
