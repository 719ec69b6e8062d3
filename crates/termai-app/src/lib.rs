//! termai application: CLI, backend client and session driver.

pub mod backend;
pub mod cli;
pub mod session;

pub use backend::{Backend, BackendDiagnoser, BackendError, PlanRequest, ProcessBackend};
pub use cli::CliArgs;
pub use session::{SessionDriver, SessionOutcome};
