//! `command` actions: gated shell commands.

use super::{ActionStatus, HandlerContext, HandlerResult};
use crate::confirmation::Authorization;
use crate::error::ActionError;
use crate::executor::ExecOutput;
use crate::ui;

/// Output tail sent along with a diagnosis request.
const DIAGNOSIS_TAIL_CHARS: usize = 2000;

pub async fn handle(ctx: &mut HandlerContext<'_>, command: &str, auto_execute: bool) -> HandlerResult {
    let command = command.trim();
    if command.is_empty() {
        return Err(ActionError::InvalidPayload(
            "command action has no command".to_string(),
        ));
    }

    ui::command(command);
    if ctx.gate.authorize(command, auto_execute, ctx.prompter) == Authorization::Declined {
        tracing::info!(command = %command, "Command declined by user");
        ui::status("skipped");
        ctx.log.push(format!("SKIPPED: {}", command));
        return Ok(ActionStatus::Skipped);
    }

    let out = match ctx.executor.run_shell(command).await {
        Ok(out) => out,
        Err(e) => {
            tracing::warn!(command = %command, error = %e, "Command could not be launched");
            ui::error(&e.to_string());
            ctx.log.push_launch_failure("COMMAND", command, &e);
            return Ok(ActionStatus::Failed);
        }
    };

    ctx.log.push_exec("COMMAND", command, &out);
    if out.success() {
        tracing::info!(command = %command, duration_ms = out.duration.as_millis() as u64, "Command succeeded");
        return Ok(ActionStatus::Succeeded);
    }

    tracing::warn!(command = %command, exit_code = out.status, "Command failed");
    ui::error(&format!("command exited with status {}", out.status));
    diagnose(ctx, command, &out).await;
    Ok(ActionStatus::Failed)
}

async fn diagnose(ctx: &HandlerContext<'_>, command: &str, out: &ExecOutput) {
    if !ctx.settings.diagnose_failures {
        return;
    }
    let Some(diagnoser) = ctx.diagnoser else {
        return;
    };

    let failure = format!(
        "Command `{}` failed with exit code {}:\n{}",
        command,
        out.status,
        tail(&out.output, DIAGNOSIS_TAIL_CHARS)
    );
    match diagnoser.suggest_fix(&failure).await {
        Ok(suggestion) if !suggestion.trim().is_empty() => ui::hint(suggestion.trim()),
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "Fix suggestion unavailable"),
    }
}

fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    let start = text
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &text[start..]
}
