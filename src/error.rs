//! Error types for factorization, parsing, and reporting.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = NmfError> = std::result::Result<T, E>;

/// Errors raised by the engine and its I/O collaborators.
#[derive(Debug, Error)]
pub enum NmfError {
    /// A rank, iteration count, or matrix dimension is zero or inconsistent.
    #[error("Invalid dimension: {message}")]
    InvalidDimension {
        /// Which dimension was rejected and why
        message: String,
    },

    /// X, W and H cannot be multiplied together.
    #[error("Invalid shape: X is {x:?}, W is {w:?}, H is {h:?}")]
    InvalidShape {
        /// Shape of the count matrix (rows, cols)
        x: (usize, usize),
        /// Shape of W (rows, cols)
        w: (usize, usize),
        /// Shape of H (rows, cols)
        h: (usize, usize),
    },

    /// Strict mode found a NaN or infinite value after an iteration.
    #[error("Numerical degeneracy: non-finite value after iteration {iteration}")]
    NumericalDegeneracy {
        /// Zero-based index of the iteration that produced it
        iteration: usize,
    },

    /// A count matrix entry is negative or not finite.
    #[error("Invalid count {value} at ({row}, {col})")]
    InvalidCount { row: usize, col: usize, value: f64 },

    /// Malformed sparse matrix input.
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Vocabulary has fewer terms than the factor matrix has rows.
    #[error("Vocabulary has {actual} terms but the model has {expected} words")]
    Vocabulary { expected: usize, actual: usize },

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl NmfError {
    /// Create an InvalidDimension error.
    pub fn invalid_dimension(message: impl Into<String>) -> Self {
        Self::InvalidDimension {
            message: message.into(),
        }
    }

    /// Create a Parse error for a 1-based line number.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_error_mentions_all_matrices() {
        let err = NmfError::InvalidShape {
            x: (3, 4),
            w: (3, 2),
            h: (2, 5),
        };
        let msg = err.to_string();
        assert!(msg.contains("(3, 4)"));
        assert!(msg.contains("(2, 5)"));
    }

    #[test]
    fn parse_error_carries_line() {
        let err = NmfError::parse(7, "missing ':'");
        assert_eq!(err.to_string(), "Parse error on line 7: missing ':'");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: NmfError = io.into();
        assert!(matches!(err, NmfError::Io(_)));
    }
}
