//! Error types for context persistence.

use std::path::PathBuf;

use termai_core::error::TermaiError;

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("Context file {path} is unreadable: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write context file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ContextError> for TermaiError {
    fn from(err: ContextError) -> Self {
        TermaiError::Context(err.to_string())
    }
}
