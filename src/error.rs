//! Errors the drivers can end with, and the exit code each one maps to.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("provide test sequence index")]
    Usage,

    #[error("invalid test sequence index")]
    InvalidArgument(String),

    #[error(transparent)]
    Runtime(#[from] anyhow::Error),
}

impl BenchError {
    pub fn exit_code(&self) -> i32 {
        match self {
            BenchError::Usage => 1,
            BenchError::InvalidArgument(_) => 2,
            BenchError::Runtime(_) => 3,
        }
    }

    /// Usage problems are reported on stdout next to the timing line,
    /// anything else is a real failure and goes to stderr.
    pub fn is_runtime(&self) -> bool {
        matches!(self, BenchError::Runtime(_))
    }
}

impl From<lexopt::Error> for BenchError {
    fn from(_: lexopt::Error) -> Self {
        BenchError::Usage
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
