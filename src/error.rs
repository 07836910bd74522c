use nalgebra_sparse::SparseFormatError;
use thiserror::Error;

/// Precondition violations reported by the fallible (`try_*`) operations.
///
/// The panicking counterparts raise the same messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReprError {
    /// An operand does not have the `n × m` shape of the representation.
    #[error("{what} has shape {}x{}, expected {}x{}", .found.0, .found.1, .expected.0, .expected.1)]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A matrix was requested with a zero dimension.
    #[error("matrix dimensions must be positive, got {rows}x{cols}")]
    EmptyShape { rows: usize, cols: usize },

    /// Triplet or compressed-column data does not describe a valid matrix.
    #[error("invalid sparse matrix data: {0}")]
    InvalidStructure(String),
}

impl From<SparseFormatError> for ReprError {
    fn from(err: SparseFormatError) -> Self {
        ReprError::InvalidStructure(err.to_string())
    }
}

/// Check that `found` matches `expected`, naming the operand on failure.
pub(crate) fn check_shape(
    what: &'static str,
    expected: (usize, usize),
    found: (usize, usize),
) -> Result<(), ReprError> {
    if expected == found {
        Ok(())
    } else {
        Err(ReprError::ShapeMismatch {
            what,
            expected,
            found,
        })
    }
}
