//! `run` actions: launch a program, in the foreground or detached.
//!
//! The safety gate is not consulted here. The executable must exist and
//! carry an execute bit, and its argument string is passed to the shell
//! as given.

use std::path::{Path, PathBuf};

use termai_core::config::expand_home;

use super::{ActionStatus, HandlerContext, HandlerResult};
use crate::error::ActionError;
use crate::executor::shell_quote;
use crate::ui;

pub async fn handle(
    ctx: &mut HandlerContext<'_>,
    executable: &str,
    args: &str,
    background: bool,
) -> HandlerResult {
    let executable = executable.trim();
    if executable.is_empty() {
        return Err(ActionError::InvalidPayload(
            "run action has no executable".to_string(),
        ));
    }
    let args = args.trim();
    let display = if args.is_empty() {
        executable.to_string()
    } else {
        format!("{} {}", executable, args)
    };

    let path = locate(ctx.executor.working_dir(), executable)
        .ok_or_else(|| ActionError::NotFound(executable.to_string()))?;
    if !is_executable(&path) {
        return Err(ActionError::NotExecutable(path.display().to_string()));
    }

    let quoted = shell_quote(&path.to_string_lossy());
    let line = if args.is_empty() {
        quoted
    } else {
        format!("{} {}", quoted, args)
    };

    if background {
        ui::command(&format!("{} &", display));
        return Ok(match ctx.executor.spawn_background(&line) {
            Ok(pid) => {
                ui::status(&format!("started in background (pid {})", pid));
                ctx.log.push(format!("RUN (background): {}", display));
                ctx.log.push(format!("PID: {}", pid));
                ActionStatus::Succeeded
            }
            Err(e) => {
                ui::error(&e.to_string());
                ctx.log.push_launch_failure("RUN (background)", &display, &e);
                ActionStatus::Failed
            }
        });
    }

    ui::command(&display);
    Ok(match ctx.executor.run_shell(&line).await {
        Ok(out) => {
            ctx.log.push_exec("RUN", &display, &out);
            if out.success() {
                ActionStatus::Succeeded
            } else {
                ui::error(&format!("{} exited with status {}", executable, out.status));
                ActionStatus::Failed
            }
        }
        Err(e) => {
            ui::error(&e.to_string());
            ctx.log.push_launch_failure("RUN", &display, &e);
            ActionStatus::Failed
        }
    })
}

/// Resolve an executable name. Names containing a path separator are taken
/// relative to `working_dir`; bare names are looked up on `PATH`, then in
/// `working_dir`.
pub fn locate(working_dir: &Path, executable: &str) -> Option<PathBuf> {
    if executable.contains('/') || executable.starts_with('~') {
        let path = expand_home(executable);
        let path = if path.is_absolute() {
            path
        } else {
            working_dir.join(path)
        };
        return path.exists().then_some(path);
    }

    let on_path = std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(executable))
            .find(|candidate| candidate.is_file() && is_executable(candidate))
    });
    on_path.or_else(|| {
        let local = working_dir.join(executable);
        local.exists().then_some(local)
    })
}

/// Whether `path` is a regular file with an execute bit set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}
