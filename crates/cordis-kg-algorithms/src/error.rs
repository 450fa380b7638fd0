use thiserror::Error;

/// Errors raised by algorithms that validate their input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlgoError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("No negative examples available: every candidate pair is already linked")]
    NoNegativeExamples,
}

pub type AlgoResult<T> = Result<T, AlgoError>;
