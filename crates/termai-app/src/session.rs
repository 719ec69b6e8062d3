//! One full invocation: load context, plan, dispatch, persist.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use termai_action::{ui, DispatchReport, Dispatcher};
use termai_context::{carried_log, deep_context, ContextStore, EnvironmentSnapshot};
use termai_core::error::TermaiError;

use crate::backend::{Backend, PlanRequest};

/// How a session that did not hit a fatal error ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The backend answered with an empty plan.
    NoActions,
    Completed(DispatchReport),
}

pub struct SessionDriver {
    backend: Arc<dyn Backend>,
    dispatcher: Dispatcher,
    store: ContextStore,
    cwd: PathBuf,
}

impl SessionDriver {
    pub fn new(
        backend: Arc<dyn Backend>,
        dispatcher: Dispatcher,
        store: ContextStore,
        cwd: PathBuf,
    ) -> Self {
        Self {
            backend,
            dispatcher,
            store,
            cwd,
        }
    }

    /// Run one session for `query`.
    ///
    /// Only backend failures are returned as errors. Individual action
    /// failures are part of the [`DispatchReport`], and a failure to persist
    /// context is reported but does not fail the session.
    pub async fn run(&self, query: &str) -> Result<SessionOutcome, TermaiError> {
        let span = tracing::info_span!("session", id = %Uuid::new_v4());
        self.run_inner(query).instrument(span).await
    }

    async fn run_inner(&self, query: &str) -> Result<SessionOutcome, TermaiError> {
        let previous = self.store.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Previous context unreadable, starting fresh");
            String::new()
        });
        // Logs written by hand or by older builds may still be oversized.
        let previous = carried_log(&previous);
        let environment = EnvironmentSnapshot::gather(&self.cwd).render();
        let context = deep_context(&environment, &previous);

        let request = PlanRequest {
            query,
            cwd: &self.cwd,
            context: &context,
        };
        let actions = match self.backend.plan(&request).await {
            Ok(actions) => actions,
            Err(e) => {
                tracing::error!(error = %e, "Backend call failed");
                return Err(e.into());
            }
        };

        if actions.is_empty() {
            tracing::info!("Backend returned no actions");
            ui::status("No actions.");
            return Ok(SessionOutcome::NoActions);
        }

        let report = self.dispatcher.dispatch(&actions).await;
        if let Err(e) = self.store.persist(&report.log.render(), &environment) {
            tracing::warn!(error = %e, "Failed to persist context");
            ui::warn(&format!("could not save context: {}", e));
        }
        Ok(SessionOutcome::Completed(report))
    }
}
