//! Action dispatcher.
//!
//! Runs an action list strictly in order, routes each action to its handler
//! and folds every outcome, including handler errors, into one
//! [`OutcomeLog`]. No single action can end the pass.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;

use termai_core::TermaiConfig;

use crate::confirmation::{Prompter, SafetyGate};
use crate::error::GateError;
use crate::executor::Executor;
use crate::handler::{
    command, compile, configure, file, install, message, run, ActionStatus, Diagnoser,
    HandlerContext, HandlerResult, HandlerSettings,
};
use crate::outcome::OutcomeLog;
use crate::types::Action;
use crate::ui;

/// Result of one dispatch pass.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub log: OutcomeLog,
    /// One entry per input action, in order.
    pub statuses: Vec<ActionStatus>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.count(ActionStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(ActionStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(ActionStatus::Skipped)
    }

    fn count(&self, status: ActionStatus) -> usize {
        self.statuses.iter().filter(|s| **s == status).count()
    }
}

pub struct Dispatcher {
    executor: Executor,
    gate: SafetyGate,
    prompter: Arc<dyn Prompter>,
    diagnoser: Option<Arc<dyn Diagnoser>>,
    settings: HandlerSettings,
}

impl Dispatcher {
    pub fn new(executor: Executor, gate: SafetyGate, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            executor,
            gate,
            prompter,
            diagnoser: None,
            settings: HandlerSettings::default(),
        }
    }

    /// Build a dispatcher from loaded configuration.
    pub fn from_config(
        config: &TermaiConfig,
        working_dir: PathBuf,
        prompter: Arc<dyn Prompter>,
    ) -> Result<Self, GateError> {
        let gate = SafetyGate::new(&config.safety)?;
        let executor = Executor::new(&config.executor, working_dir);
        let settings = HandlerSettings {
            diagnose_failures: config.actions.diagnose_failures,
            escalation_command: config.actions.escalation_command.clone(),
            default_manager: config.install.resolve_manager(),
        };
        Ok(Self::new(executor, gate, prompter).with_settings(settings))
    }

    pub fn with_diagnoser(mut self, diagnoser: Arc<dyn Diagnoser>) -> Self {
        self.diagnoser = Some(diagnoser);
        self
    }

    pub fn with_settings(mut self, settings: HandlerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Run every action in order and collect the outcome log.
    pub async fn dispatch(&self, actions: &[Action]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for (index, action) in actions.iter().enumerate() {
            let kind = action
                .kind()
                .map(|k| k.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let span = tracing::info_span!("action", index, kind = %kind);

            let status = self
                .dispatch_one(action, &mut report.log)
                .instrument(span)
                .await;
            report.statuses.push(status);
        }
        tracing::info!(
            total = report.statuses.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Dispatch complete"
        );
        report
    }

    async fn dispatch_one(&self, action: &Action, log: &mut OutcomeLog) -> ActionStatus {
        let mut ctx = HandlerContext {
            executor: &self.executor,
            gate: &self.gate,
            prompter: self.prompter.as_ref(),
            diagnoser: self.diagnoser.as_deref(),
            settings: &self.settings,
            log,
        };

        let result: HandlerResult = match action {
            Action::Text { content } => Ok(message::handle_text(&mut ctx, content)),
            Action::Error { content } => Ok(message::handle_error(&mut ctx, content)),
            Action::Command {
                command: line,
                auto_execute,
            } => command::handle(&mut ctx, line, *auto_execute).await,
            Action::Run {
                executable,
                args,
                background,
            } => run::handle(&mut ctx, executable, args, *background).await,
            Action::CompileAndRun {
                source,
                compile_command,
                run_command,
                auto_execute,
            } => {
                compile::handle(&mut ctx, source, compile_command, run_command, *auto_execute)
                    .await
            }
            Action::WriteFile { path, content } => file::handle(&mut ctx, path, content).await,
            Action::Configure { path, append } => configure::handle(&mut ctx, path, append).await,
            Action::Install { packages, manager } => {
                install::handle(&mut ctx, packages, manager.as_deref()).await
            }
            Action::Unknown { kind } => {
                tracing::debug!(kind = %kind, "Skipping unrecognised action");
                Ok(ActionStatus::Skipped)
            }
        };

        match result {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "Action could not be carried out");
                ui::error(&e.to_string());
                let kind = action.kind().map(|k| k.to_string()).unwrap_or_default();
                ctx.log.push(format!("ACTION {} FAILED: {}", kind.to_uppercase(), e));
                ActionStatus::Failed
            }
        }
    }
}
