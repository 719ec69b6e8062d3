//! Client for the external reasoning backend.
//!
//! The backend is a separate program. It receives the query, working
//! directory and context blob as flags and answers on stdout: a JSON action
//! list for plans, free text for diagnoses, one suggestion per line for
//! completions.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use termai_action::handler::Diagnoser;
use termai_action::{parse_action_list, Action, ResponseError};
use termai_core::config::{expand_home, BackendConfig};
use termai_core::error::TermaiError;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to launch backend `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Backend exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },
    #[error("Backend response is malformed: {0}")]
    Malformed(String),
    #[error("Backend returned an empty response")]
    Empty,
}

impl From<ResponseError> for BackendError {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::Empty => BackendError::Empty,
            ResponseError::Malformed(msg) => BackendError::Malformed(msg),
        }
    }
}

impl From<BackendError> for TermaiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Empty => TermaiError::EmptyResponse,
            BackendError::Malformed(msg) => TermaiError::MalformedResponse(msg),
            other => TermaiError::Backend(other.to_string()),
        }
    }
}

/// One planning request.
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    pub query: &'a str,
    pub cwd: &'a Path,
    /// Environment snapshot plus the previous session's outcome log.
    pub context: &'a str,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Turn a query into an ordered action list.
    async fn plan(&self, request: &PlanRequest<'_>) -> Result<Vec<Action>, BackendError>;

    /// A short fix suggestion for a failed command.
    async fn diagnose(&self, failure: &str, cwd: &Path) -> Result<String, BackendError>;

    /// Query completions for an interactive shell.
    async fn complete(&self, partial: &str, cwd: &Path) -> Result<Vec<String>, BackendError>;
}

/// Runs the backend as a child process per request.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    program: String,
    args: Vec<String>,
}

impl ProcessBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Leading `~` in the program and its arguments is expanded.
    pub fn from_config(config: &BackendConfig) -> Self {
        let expand = |s: &str| expand_home(s).to_string_lossy().into_owned();
        Self::new(
            expand(&config.command),
            config.args.iter().map(|a| expand(a)).collect(),
        )
    }

    async fn invoke(
        &self,
        query: &str,
        cwd: &Path,
        context: &str,
        mode: Option<&str>,
    ) -> Result<String, BackendError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--query")
            .arg(query)
            .arg("--cwd")
            .arg(cwd)
            .arg("--context-data")
            .arg(context);
        if let Some(mode) = mode {
            cmd.arg(mode);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(program = %self.program, mode = mode.unwrap_or("plan"), "Calling backend");
        let output = cmd.output().await.map_err(|source| BackendError::Launch {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(BackendError::Failed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Backend for ProcessBackend {
    async fn plan(&self, request: &PlanRequest<'_>) -> Result<Vec<Action>, BackendError> {
        let stdout = self
            .invoke(request.query, request.cwd, request.context, None)
            .await?;
        let actions = parse_action_list(&stdout)?;
        tracing::info!(count = actions.len(), "Backend returned actions");
        Ok(actions)
    }

    async fn diagnose(&self, failure: &str, cwd: &Path) -> Result<String, BackendError> {
        let stdout = self.invoke(failure, cwd, "", Some("--fix-mode")).await?;
        Ok(stdout.trim().to_string())
    }

    async fn complete(&self, partial: &str, cwd: &Path) -> Result<Vec<String>, BackendError> {
        let stdout = self
            .invoke(partial, cwd, "", Some("--complete-mode"))
            .await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Exposes a backend's `diagnose` as the dispatcher's fix-suggestion hook.
pub struct BackendDiagnoser {
    backend: Arc<dyn Backend>,
    cwd: std::path::PathBuf,
}

impl BackendDiagnoser {
    pub fn new(backend: Arc<dyn Backend>, cwd: impl Into<std::path::PathBuf>) -> Self {
        Self {
            backend,
            cwd: cwd.into(),
        }
    }
}

#[async_trait]
impl Diagnoser for BackendDiagnoser {
    async fn suggest_fix(&self, failure: &str) -> Result<String, String> {
        self.backend
            .diagnose(failure, &self.cwd)
            .await
            .map_err(|e| e.to_string())
    }
}
