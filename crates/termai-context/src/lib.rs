//! Cross-invocation context for termai.
//!
//! [`ContextStore`] carries the outcome log of one session into the next;
//! [`environment`] describes the machine the session runs on.

pub mod environment;
pub mod error;
pub mod store;

pub use environment::EnvironmentSnapshot;
pub use error::ContextError;
pub use store::{carried_log, deep_context, ContextStore, MAX_CARRIED_LOG_BYTES};
