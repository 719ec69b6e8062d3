//! Error types for the action engine.

use termai_core::error::TermaiError;

/// Failure to obtain a completed child process.
///
/// A child that ran and exited nonzero is *not* an error; it is reported
/// through the exit status of [`crate::executor::ExecOutput`].
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error while running `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from action handlers. The dispatcher turns every one of these into
/// an outcome-log entry; none of them end the session.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Payload validation failed: {0}")]
    InvalidPayload(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not executable: {0}")]
    NotExecutable(String),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from interpreting a backend response.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("response is empty")]
    Empty,
    #[error("response is malformed: {0}")]
    Malformed(String),
}

impl From<ResponseError> for TermaiError {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::Empty => TermaiError::EmptyResponse,
            ResponseError::Malformed(msg) => TermaiError::MalformedResponse(msg),
        }
    }
}

/// Errors building the safety gate.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Invalid dangerous-command pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl From<GateError> for TermaiError {
    fn from(err: GateError) -> Self {
        TermaiError::Config(err.to_string())
    }
}
