//! Error types for Benchdeck operations

/// Result type for Benchdeck operations
pub type Result<T> = std::result::Result<T, BenchdeckError>;

/// Error types for the Benchdeck coordination core
#[derive(Debug, thiserror::Error)]
pub enum BenchdeckError {
    /// Malformed input, rejected locally or by the server
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced domain or test set no longer exists
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation cannot proceed while another is in progress
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transport-level failure, no usable response
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl BenchdeckError {
    /// Whether this error refers to a resource that no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BenchdeckError::NotFound(_))
    }
}

impl From<String> for BenchdeckError {
    fn from(s: String) -> Self {
        BenchdeckError::Other(s)
    }
}

impl From<&str> for BenchdeckError {
    fn from(s: &str) -> Self {
        BenchdeckError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for BenchdeckError {
    fn from(err: anyhow::Error) -> Self {
        BenchdeckError::Other(err.to_string())
    }
}
