//! `text` and `error` actions: display only.

use super::{ActionStatus, HandlerContext};
use crate::ui;

pub fn handle_text(ctx: &mut HandlerContext<'_>, content: &str) -> ActionStatus {
    ui::message(content);
    ctx.log.push(format!("AI: {}", content));
    ActionStatus::Succeeded
}

/// Surfaces an error reported by the backend; nothing failed locally.
pub fn handle_error(ctx: &mut HandlerContext<'_>, content: &str) -> ActionStatus {
    ui::error(content);
    ctx.log.push(format!("ERROR: {}", content));
    ActionStatus::Succeeded
}
