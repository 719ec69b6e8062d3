//! The outcome log: an ordered textual record of what each action did.

use std::fmt;

use termai_core::text::bounded_tail;

use crate::executor::ExecOutput;

/// Exit status a POSIX shell reports for an unknown command.
const SHELL_COMMAND_NOT_FOUND: i32 = 127;

/// Captured output kept per process block. Earlier output is dropped.
pub const MAX_CAPTURED_OUTPUT_BYTES: usize = 16 * 1024;

/// Ordered log of per-action blocks. Rendering joins lines with `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeLog {
    lines: Vec<String>,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line. NUL bytes are dropped.
    pub fn push(&mut self, line: impl Into<String>) {
        let mut line = line.into();
        if line.contains('\0') {
            line.retain(|c| c != '\0');
        }
        self.lines.push(line);
    }

    /// Append the standard block for a completed child process.
    pub fn push_exec(&mut self, label: &str, subject: &str, out: &ExecOutput) {
        self.push(format!("{}: {}", label, subject));
        self.push(format!(
            "EXIT CODE: {}{}",
            out.status,
            if out.status == SHELL_COMMAND_NOT_FOUND {
                " (command not found)"
            } else {
                ""
            }
        ));
        self.push(format!("DURATION: {:.2}s", out.duration.as_secs_f64()));
        let captured = bounded_tail(out.output.trim_end(), MAX_CAPTURED_OUTPUT_BYTES);
        if !captured.is_empty() {
            self.push("OUTPUT:");
            self.push(captured);
        }
    }

    /// Append the block for a process that could not be started at all.
    pub fn push_launch_failure(&mut self, label: &str, subject: &str, error: &dyn fmt::Display) {
        self.push(format!("{}: {}", label, subject));
        self.push(format!("LAUNCH FAILED: {}", error));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for OutcomeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
