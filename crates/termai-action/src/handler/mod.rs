//! Per-kind action handlers.
//!
//! Each handler records its own outcome block and returns an
//! [`ActionStatus`]. An `Err` means the action could not even be attempted;
//! the dispatcher records it and carries on.

pub mod command;
pub mod compile;
pub mod configure;
pub mod file;
pub mod install;
pub mod message;
pub mod run;

use async_trait::async_trait;

use crate::confirmation::{Prompter, SafetyGate};
use crate::error::ActionError;
use crate::executor::Executor;
use crate::outcome::OutcomeLog;

/// How a single action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Succeeded,
    Failed,
    /// Declined at a confirmation prompt, or not applicable.
    Skipped,
}

pub type HandlerResult = Result<ActionStatus, ActionError>;

/// Asks for a fix suggestion after a command fails. Best-effort: errors
/// are logged and otherwise ignored.
#[async_trait]
pub trait Diagnoser: Send + Sync {
    async fn suggest_fix(&self, failure: &str) -> Result<String, String>;
}

/// Dispatcher settings that handlers consult.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub diagnose_failures: bool,
    pub escalation_command: String,
    pub default_manager: String,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            diagnose_failures: true,
            escalation_command: "sudo".to_string(),
            default_manager: "apt".to_string(),
        }
    }
}

/// Everything a handler may touch while running one action.
pub struct HandlerContext<'a> {
    pub executor: &'a Executor,
    pub gate: &'a SafetyGate,
    pub prompter: &'a dyn Prompter,
    pub diagnoser: Option<&'a dyn Diagnoser>,
    pub settings: &'a HandlerSettings,
    pub log: &'a mut OutcomeLog,
}
