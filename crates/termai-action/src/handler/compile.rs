//! `compile_and_run` actions. The run step is gated on a clean compile.
//!
//! Only `run_command` goes through the safety gate. `compile_command` runs
//! unprompted, like the program of a `run` action.

use super::{ActionStatus, HandlerContext, HandlerResult};
use crate::confirmation::Authorization;
use crate::error::ActionError;
use crate::ui;

pub async fn handle(
    ctx: &mut HandlerContext<'_>,
    source: &str,
    compile_command: &str,
    run_command: &str,
    auto_execute: bool,
) -> HandlerResult {
    let (source, compile_command, run_command) =
        (source.trim(), compile_command.trim(), run_command.trim());
    if compile_command.is_empty() {
        return Err(ActionError::InvalidPayload(
            "compile_and_run action has no compile_command".to_string(),
        ));
    }

    if !source.is_empty() && !ctx.executor.resolve(source).exists() {
        tracing::warn!(source = %source, "Source file missing, not compiling");
        ui::error(&format!("{}: source file not found", source));
        ctx.log.push(format!("COMPILE: {}", compile_command));
        ctx.log.push(format!("SOURCE NOT FOUND: {}", source));
        ctx.log.push("RUN: skipped (source missing)");
        return Ok(ActionStatus::Failed);
    }

    ui::command(compile_command);
    let compiled = match ctx.executor.run_shell(compile_command).await {
        Ok(out) => {
            ctx.log.push_exec("COMPILE", compile_command, &out);
            out.success()
        }
        Err(e) => {
            ui::error(&e.to_string());
            ctx.log.push_launch_failure("COMPILE", compile_command, &e);
            false
        }
    };
    if !compiled {
        ui::error("compilation failed");
        ctx.log.push("RUN: skipped (compile failed)");
        return Ok(ActionStatus::Failed);
    }
    ui::status("compiled");

    if run_command.is_empty() {
        return Ok(ActionStatus::Succeeded);
    }
    ui::command(run_command);
    if ctx.gate.authorize(run_command, auto_execute, ctx.prompter) == Authorization::Declined {
        ui::status("skipped");
        ctx.log.push(format!("SKIPPED: {}", run_command));
        return Ok(ActionStatus::Skipped);
    }

    Ok(match ctx.executor.run_shell(run_command).await {
        Ok(out) => {
            ctx.log.push_exec("RUN", run_command, &out);
            if out.success() {
                ActionStatus::Succeeded
            } else {
                ui::error(&format!("program exited with status {}", out.status));
                ActionStatus::Failed
            }
        }
        Err(e) => {
            ui::error(&e.to_string());
            ctx.log.push_launch_failure("RUN", run_command, &e);
            ActionStatus::Failed
        }
    })
}
