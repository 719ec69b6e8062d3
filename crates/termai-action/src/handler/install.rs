//! `install` actions: one package-manager call per package, in order.

use super::{ActionStatus, HandlerContext, HandlerResult};
use crate::error::ActionError;
use crate::executor::shell_quote;
use crate::ui;

pub async fn handle(
    ctx: &mut HandlerContext<'_>,
    packages: &[String],
    manager: Option<&str>,
) -> HandlerResult {
    let packages: Vec<&str> = packages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if packages.is_empty() {
        return Err(ActionError::InvalidPayload(
            "install action lists no packages".to_string(),
        ));
    }
    // Taken as a command prefix, so values like "sudo apt" work.
    let manager = manager.unwrap_or(&ctx.settings.default_manager).trim();

    let mut failed = Vec::new();
    for package in &packages {
        let line = format!("{} install -y {}", manager, shell_quote(package));
        ui::command(&line);
        match ctx.executor.run_shell(&line).await {
            Ok(out) => {
                ctx.log.push_exec("INSTALL", package, &out);
                if out.success() {
                    tracing::info!(package = %package, manager = %manager, "Package installed");
                } else {
                    tracing::warn!(package = %package, exit_code = out.status, "Package install failed");
                    ui::error(&format!("{}: install failed (exit {})", package, out.status));
                    failed.push(*package);
                }
            }
            Err(e) => {
                ui::error(&e.to_string());
                ctx.log.push_launch_failure("INSTALL", package, &e);
                failed.push(*package);
            }
        }
    }

    let installed = packages.len() - failed.len();
    let mut summary = format!(
        "INSTALL SUMMARY: {}/{} packages installed",
        installed,
        packages.len()
    );
    if !failed.is_empty() {
        summary.push_str(&format!(" (failed: {})", failed.join(", ")));
    }
    ui::status(&summary);
    ctx.log.push(summary);

    Ok(if failed.is_empty() {
        ActionStatus::Succeeded
    } else {
        ActionStatus::Failed
    })
}
