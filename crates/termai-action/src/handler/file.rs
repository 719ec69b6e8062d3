//! `write_file` actions, plus the escape decoding and escalated directory
//! creation that `configure` shares.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use termai_core::config::expand_home;

use super::{ActionStatus, HandlerContext, HandlerResult};
use crate::error::ActionError;
use crate::ui;

/// Decode `\n`, `\t` and `\\` sequences in backend-supplied content.
///
/// Content that already contains a real newline is taken as decoded and
/// returned unchanged, so literal backslash sequences inside real
/// multi-line files (C string literals, regexes) survive.
pub fn decode_escapes(content: &str) -> String {
    if content.contains('\n') {
        return content.to_string();
    }
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            _ => {
                out.push('\\');
                continue;
            }
        }
        chars.next();
    }
    out
}

/// Resolve an action path: expand `~`, then anchor relative paths at the
/// working directory.
pub(crate) fn target_path(ctx: &HandlerContext<'_>, raw: &str) -> PathBuf {
    ctx.executor.resolve(expand_home(raw.trim()))
}

/// Create the parent directory of `path`, retrying through the escalation
/// command when the plain attempt is refused.
pub(crate) async fn ensure_parent_dir(
    ctx: &HandlerContext<'_>,
    path: &Path,
) -> Result<(), ActionError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if parent.is_dir() {
        return Ok(());
    }
    match tokio::fs::create_dir_all(parent).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            tracing::info!(dir = %parent.display(), "Permission denied, retrying with escalation");
            let dir = parent.to_string_lossy();
            let out = ctx
                .executor
                .run_program(&ctx.settings.escalation_command, &["mkdir", "-p", &*dir])
                .await?;
            if out.success() {
                Ok(())
            } else {
                Err(ActionError::Io(std::io::Error::new(
                    ErrorKind::PermissionDenied,
                    format!("cannot create {}: {}", parent.display(), out.output.trim()),
                )))
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Pipe `content` into `sh -c <script> <tag> <path>` under the escalation
/// command. `script` redirects stdin to `"$1"`.
pub(crate) async fn escalated_write(
    ctx: &HandlerContext<'_>,
    script: &str,
    tag: &str,
    path: &Path,
    content: &[u8],
) -> Result<(), ActionError> {
    let target = path.to_string_lossy();
    let out = ctx
        .executor
        .run_with_input(
            &ctx.settings.escalation_command,
            &["sh", "-c", script, tag, &*target],
            content,
        )
        .await?;
    if out.success() {
        Ok(())
    } else {
        Err(ActionError::Io(std::io::Error::new(
            ErrorKind::PermissionDenied,
            format!("escalated write to {} failed: {}", path.display(), out.output.trim()),
        )))
    }
}

pub async fn handle(ctx: &mut HandlerContext<'_>, path: &str, content: &str) -> HandlerResult {
    if path.trim().is_empty() {
        return Err(ActionError::InvalidPayload(
            "write_file action has no path".to_string(),
        ));
    }
    let target = target_path(ctx, path);
    let content = decode_escapes(content);

    if let Err(e) = ensure_parent_dir(ctx, &target).await {
        ui::error(&e.to_string());
        ctx.log.push(format!("WRITE FAILED: {}", target.display()));
        ctx.log.push(format!("ERROR: {}", e));
        return Ok(ActionStatus::Failed);
    }

    let written = match tokio::fs::write(&target, content.as_bytes()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            tracing::info!(path = %target.display(), "Permission denied, retrying with escalation");
            escalated_write(ctx, r#"cat > "$1""#, "termai-write", &target, content.as_bytes()).await
        }
        Err(e) => Err(e.into()),
    };
    if let Err(e) = written {
        ui::error(&e.to_string());
        ctx.log.push(format!("WRITE FAILED: {}", target.display()));
        ctx.log.push(format!("ERROR: {}", e));
        return Ok(ActionStatus::Failed);
    }

    if content.starts_with("#!") {
        mark_executable(&target).await;
    }

    tracing::info!(path = %target.display(), bytes = content.len(), "File written");
    ui::status(&format!("wrote {} ({} bytes)", target.display(), content.len()));
    ctx.log.push(format!("FILE WRITTEN: {}", target.display()));
    ctx.log.push(format!("BYTES: {}", content.len()));
    Ok(ActionStatus::Succeeded)
}

#[cfg(unix)]
async fn mark_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o755);
    if let Err(e) = tokio::fs::set_permissions(path, perms).await {
        tracing::debug!(path = %path.display(), error = %e, "Could not mark script executable");
    }
}

#[cfg(not(unix))]
async fn mark_executable(_path: &Path) {}
