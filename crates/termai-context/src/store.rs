//! Two-artifact context store.
//!
//! `ai_last_output` holds the latest outcome log verbatim. `ai_deep_context`
//! holds the environment snapshot followed by that same log. Both are
//! replaced wholesale on every [`ContextStore::persist`] through a
//! write-to-temp-then-rename, so readers never see a partial file.
//!
//! There is no locking: one engine instance per user is assumed.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use std::borrow::Cow;

use termai_core::config::ContextConfig;
use termai_core::text::bounded_tail;
use uuid::Uuid;

use crate::error::ContextError;

pub const LAST_OUTPUT_FILE: &str = "ai_last_output";
pub const DEEP_CONTEXT_FILE: &str = "ai_deep_context";

/// Separates the environment snapshot from the outcome log in the deep context.
const PREVIOUS_OUTPUT_HEADER: &str = "=== PREVIOUS OUTPUT ===";

/// Most outcome-log bytes carried from one session into the next. The
/// backend receives the context as a single argument, which Linux caps at
/// 128 KiB, and the environment snapshot shares that room.
pub const MAX_CARRIED_LOG_BYTES: usize = 64 * 1024;

/// The part of an outcome log that may be carried into the next session:
/// NUL bytes removed and at most the last [`MAX_CARRIED_LOG_BYTES`].
pub fn carried_log(log: &str) -> Cow<'_, str> {
    bounded_tail(log, MAX_CARRIED_LOG_BYTES)
}

#[derive(Debug, Clone)]
pub struct ContextStore {
    dir: PathBuf,
}

impl ContextStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.resolve_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn last_output_path(&self) -> PathBuf {
        self.dir.join(LAST_OUTPUT_FILE)
    }

    pub fn deep_context_path(&self) -> PathBuf {
        self.dir.join(DEEP_CONTEXT_FILE)
    }

    /// The outcome log persisted by the previous session, or `""` if none.
    pub fn load(&self) -> Result<String, ContextError> {
        read_or_empty(&self.last_output_path())
    }

    /// The full context persisted by the previous session, or `""` if none.
    pub fn load_deep(&self) -> Result<String, ContextError> {
        read_or_empty(&self.deep_context_path())
    }

    /// Overwrite both artifacts with this session's results. Oversized logs
    /// are cut down with [`carried_log`] first.
    pub fn persist(&self, outcome_log: &str, environment: &str) -> Result<(), ContextError> {
        let carried = carried_log(outcome_log);
        let outcome_log: &str = &carried;
        std::fs::create_dir_all(&self.dir).map_err(|source| ContextError::Write {
            path: self.dir.clone(),
            source,
        })?;

        write_atomic(&self.last_output_path(), outcome_log.as_bytes())?;
        write_atomic(
            &self.deep_context_path(),
            deep_context(environment, outcome_log).as_bytes(),
        )?;
        tracing::debug!(
            dir = %self.dir.display(),
            bytes = outcome_log.len(),
            "Context persisted"
        );
        Ok(())
    }
}

/// The full-context layout: environment snapshot, then the outcome log.
pub fn deep_context(environment: &str, outcome_log: &str) -> String {
    let mut out = String::with_capacity(environment.len() + outcome_log.len() + 32);
    out.push_str(environment.trim_end());
    out.push_str("\n\n");
    out.push_str(PREVIOUS_OUTPUT_HEADER);
    out.push('\n');
    out.push_str(outcome_log);
    out
}

fn read_or_empty(path: &Path) -> Result<String, ContextError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(ContextError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write `bytes` to a uniquely named sibling of `path`, then rename it over
/// `path`. The temp file is removed if anything fails before the rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ContextError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    let result = (|| {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    })();

    result.map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        ContextError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}
