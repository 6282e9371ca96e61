//! Core error types for Proteus

use thiserror::Error;

/// Main error type for Proteus operations
#[derive(Error, Debug)]
pub enum ProteusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Clustering error: {0}")]
    Clustering(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias for Proteus operations
pub type ProteusResult<T> = Result<T, ProteusError>;

impl ProteusError {
    /// Process exit code the CLI reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ProteusError::Configuration(_) => 2,
            ProteusError::Io(_) | ProteusError::NotFound(_) => 3,
            ProteusError::Parse(_) => 4,
            ProteusError::Clustering(_) => 5,
            _ => 1,
        }
    }
}

// Conversion implementations for common error types
impl From<serde_json::Error> for ProteusError {
    fn from(err: serde_json::Error) -> Self {
        ProteusError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for ProteusError {
    fn from(err: anyhow::Error) -> Self {
        ProteusError::Other(err.to_string())
    }
}
