use thiserror::Error;

/// Logging setup errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogError {
    /// Level filter could not be parsed
    #[error("invalid log filter: {0}")]
    Filter(String),

    /// Global subscriber could not be installed
    #[error("failed to initialise logging: {0}")]
    Init(String),
}

/// Result type for logging setup
pub type LogResult<T> = Result<T, LogError>;
