//! Action execution engine for termai.
//!
//! Turns an ordered list of backend-produced actions into side effects on
//! the local machine: gated shell commands, file writes, program launches,
//! compiles and package installs. Every outcome lands in an [`OutcomeLog`].

pub mod confirmation;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod handler;
pub mod outcome;
pub mod parse;
pub mod types;
pub mod ui;

pub use confirmation::{Prompter, SafetyGate, ScriptedPrompter, StdinPrompter};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::{ActionError, ExecError, GateError, ResponseError};
pub use executor::{ExecOutput, Executor};
pub use handler::{ActionStatus, Diagnoser, HandlerSettings};
pub use outcome::OutcomeLog;
pub use parse::parse_action_list;
pub use types::{Action, ActionDescriptor, ActionKind};
