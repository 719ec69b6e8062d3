use thiserror::Error;

/// Top-level error type for termai.
///
/// Only session-fatal conditions are represented here. Failures of a single
/// action are recorded in the outcome log by the dispatcher and never surface
/// as a `TermaiError`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TermaiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Backend returned an empty response")]
    EmptyResponse,

    #[error("Context store error: {0}")]
    Context(String),
}

impl From<toml::de::Error> for TermaiError {
    fn from(err: toml::de::Error) -> Self {
        TermaiError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TermaiError {
    fn from(err: toml::ser::Error) -> Self {
        TermaiError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TermaiError {
    fn from(err: serde_json::Error) -> Self {
        TermaiError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for termai operations.
pub type Result<T> = std::result::Result<T, TermaiError>;
