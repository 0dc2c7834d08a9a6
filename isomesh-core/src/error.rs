//! Error types for isomesh

use thiserror::Error;

/// Main error type for isomesh operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Size mismatch for {what}: expected {expected}, got {actual}")]
    SizeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("Parallel desynchronisation: {0}")]
    ParallelDesync(String),

    #[error("Communication error: {0}")]
    Communication(String),
}

impl Error {
    /// Shorthand for a [`Error::SizeMismatch`]
    pub fn size_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Error::SizeMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}

/// Result type alias for isomesh operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fail with [`Error::SizeMismatch`] unless `actual == expected`
pub fn check_size(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::size_mismatch(what, expected, actual))
    }
}
