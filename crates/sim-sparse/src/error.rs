//! Error types for the sparse engine.

use std::fmt;

/// Failures surfaced by matrix operations.
///
/// All operations abort on failure with no partial success; after a
/// [`Error::Singular`] the matrix remains inspectable through
/// [`Matrix::singular_row`](crate::Matrix::singular_row) and
/// [`Matrix::singular_col`](crate::Matrix::singular_col).
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Ordering could not find an acceptable pivot.
    Singular { row: usize, col: usize },
    /// Refactorization hit an exactly zero pivot.
    ZeroPivot { step: usize },
    /// A right-hand-side or solution vector is shorter than the matrix.
    SizeMismatch { expected: usize, got: usize },
    /// The operation requires a factored matrix.
    NotFactored,
    /// The operation requires an unfactored matrix.
    AlreadyFactored,
    /// A reference past the declared size on a non-expandable matrix.
    SizeFixed { index: usize, size: usize },
    /// Matrix creation with a non-positive size.
    InvalidSize { size: usize },
    /// Real operation on a complex matrix or vice versa.
    ComplexMismatch,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Singular { row, col } => {
                write!(f, "matrix is singular at row {}, column {}", row, col)
            }
            Error::ZeroPivot { step } => write!(f, "zero pivot at step {}", step),
            Error::SizeMismatch { expected, got } => {
                write!(f, "vector of length {} is too short for size {}", got, expected)
            }
            Error::NotFactored => write!(f, "matrix is not factored"),
            Error::AlreadyFactored => write!(f, "matrix is already factored"),
            Error::SizeFixed { index, size } => {
                write!(f, "index {} exceeds fixed matrix size {}", index, size)
            }
            Error::InvalidSize { size } => write!(f, "invalid matrix size: {}", size),
            Error::ComplexMismatch => {
                write!(f, "operation does not match the matrix arithmetic mode")
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_descriptive() {
        let e = Error::Singular { row: 3, col: 4 };
        assert_eq!(e.to_string(), "matrix is singular at row 3, column 4");
        let e = Error::ZeroPivot { step: 2 };
        assert_eq!(e.to_string(), "zero pivot at step 2");
    }
}
