//! `configure` actions: back up, then append. Never truncates the target.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use super::file::{decode_escapes, ensure_parent_dir, escalated_write, target_path};
use super::{ActionStatus, HandlerContext, HandlerResult};
use crate::error::ActionError;
use crate::ui;

pub async fn handle(ctx: &mut HandlerContext<'_>, path: &str, append: &str) -> HandlerResult {
    if path.trim().is_empty() {
        return Err(ActionError::InvalidPayload(
            "configure action has no path".to_string(),
        ));
    }
    let addition = decode_escapes(append);
    if addition.trim().is_empty() {
        return Err(ActionError::InvalidPayload(
            "configure action has nothing to append".to_string(),
        ));
    }
    let target = target_path(ctx, path);

    match apply(ctx, &target, &addition).await {
        Ok(backup) => {
            tracing::info!(path = %target.display(), "Configuration updated");
            ui::status(&format!("updated {}", target.display()));
            ctx.log.push(format!("CONFIGURED: {}", target.display()));
            if let Some(backup) = backup {
                ctx.log.push(format!("BACKUP: {}", backup.display()));
            }
            ctx.log.push(format!("APPENDED: {} bytes", addition.len()));
            Ok(ActionStatus::Succeeded)
        }
        Err(e) => {
            tracing::warn!(path = %target.display(), error = %e, "Configuration failed");
            ui::error(&e.to_string());
            ctx.log.push(format!("CONFIGURE FAILED: {}", target.display()));
            ctx.log.push(format!("ERROR: {}", e));
            Ok(ActionStatus::Failed)
        }
    }
}

async fn apply(
    ctx: &HandlerContext<'_>,
    target: &Path,
    addition: &str,
) -> Result<Option<PathBuf>, ActionError> {
    let existing = match tokio::fs::read(target).await {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let backup = match existing {
        Some(_) => Some(backup(ctx, target).await?),
        None => None,
    };
    ensure_parent_dir(ctx, target).await?;

    let needs_separator = existing
        .as_deref()
        .is_some_and(|bytes| !bytes.is_empty() && !bytes.ends_with(b"\n"));
    let mut text = String::with_capacity(addition.len() + 2);
    if needs_separator {
        text.push('\n');
    }
    text.push_str(addition);
    if !text.ends_with('\n') {
        text.push('\n');
    }

    let appended = async {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(target)
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await
    }
    .await;
    match appended {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            tracing::info!(path = %target.display(), "Permission denied, retrying with escalation");
            escalated_write(ctx, r#"cat >> "$1""#, "termai-append", target, text.as_bytes())
                .await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(backup)
}

/// Copy `target` to a fresh `<name>.backup.<timestamp>` sibling.
async fn backup(ctx: &HandlerContext<'_>, target: &Path) -> Result<PathBuf, ActionError> {
    let dest = backup_path(target, &chrono::Local::now().format("%Y%m%d_%H%M%S").to_string());
    match tokio::fs::copy(target, &dest).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            let src = target.to_string_lossy();
            let dst = dest.to_string_lossy();
            let out = ctx
                .executor
                .run_program(&ctx.settings.escalation_command, &["cp", "-p", &*src, &*dst])
                .await?;
            if !out.success() {
                return Err(ActionError::Io(std::io::Error::new(
                    ErrorKind::PermissionDenied,
                    format!("cannot back up {}: {}", target.display(), out.output.trim()),
                )));
            }
        }
        Err(e) => return Err(e.into()),
    }
    tracing::debug!(backup = %dest.display(), "Backup created");
    Ok(dest)
}

/// First unused backup name for `target` at `stamp`.
fn backup_path(target: &Path, stamp: &str) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    let base = target.with_file_name(format!("{}.backup.{}", name, stamp));
    if !base.exists() {
        return base;
    }
    (1..)
        .map(|n| target.with_file_name(format!("{}.backup.{}.{}", name, stamp, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(base)
}
