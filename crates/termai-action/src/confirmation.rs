//! Safety gate and interactive confirmation.
//!
//! Commands matching the destructive denylist need an explicit "yes";
//! commands the backend marked `auto_execute: false` only need the user not
//! to say "no". Everything else runs without asking.

use regex::Regex;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Mutex;

use termai_core::config::SafetyConfig;

use crate::error::GateError;

/// Question asked before a denylisted command. Default answer: no.
pub const DANGEROUS_PROMPT: &str = "Execute potentially dangerous command? [y/N] ";
/// Question asked before an opt-out command. Default answer: yes.
pub const CONFIRM_PROMPT: &str = "Execute? [Y/n] ";

/// Built-in destructive-command patterns. Recursive force-remove is
/// matched separately by [`RecursiveForceRemove`].
const BUILTIN_PATTERNS: &[&str] = &[
    // disk format / partitioning
    r"\bmkfs(?:\.\w+)?\b",
    r"\b(?:fdisk|sfdisk|wipefs|parted)\b",
    r"\bformat\s+[a-zA-Z]:",
    // shutdown / reboot, only in command position
    r"(?:^\s*|[;&|(]\s*|\bsudo\s+)(?:shutdown|reboot|poweroff|halt)\b",
    r"(?:^\s*|[;&|(]\s*|\bsudo\s+)init\s+[06]\b",
    // raw block device write
    r"\bdd\b.*\bof=/dev/(?:sd|hd|vd|xvd|nvme|mmcblk|disk)",
    r">\s*/dev/(?:sd|hd|vd|xvd|nvme|mmcblk|disk)",
];

/// `rm` with both a recursive and a force flag, in any order or spelling
/// (`-rf`, `-r -f`, `-r --force`, `--recursive -f`, ...). Each flag is
/// looked for on its own, within one simple command.
struct RecursiveForceRemove {
    rm: Regex,
    recursive: Regex,
    force: Regex,
}

impl RecursiveForceRemove {
    fn new() -> Result<Self, GateError> {
        Ok(Self {
            rm: compile(r"\brm\b")?,
            recursive: compile(r"(?:^|\s)(?:-[a-zA-Z]*[rR][a-zA-Z]*|--recursive)(?:\s|$)")?,
            force: compile(r"(?:^|\s)(?:-[a-zA-Z]*f[a-zA-Z]*|--force)(?:\s|$)")?,
        })
    }

    fn is_match(&self, command: &str) -> bool {
        command
            .split(|c: char| matches!(c, ';' | '&' | '|' | '\n'))
            .any(|segment| {
                self.rm.find(segment).is_some_and(|m| {
                    let flags = &segment[m.end()..];
                    self.recursive.is_match(flags) && self.force.is_match(flags)
                })
            })
    }
}

fn compile(pattern: &str) -> Result<Regex, GateError> {
    Regex::new(pattern).map_err(|e| GateError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

// =============================================================================
// Prompting
// =============================================================================

/// Source of answers to confirmation questions.
pub trait Prompter: Send + Sync {
    /// Ask `question` and return the raw line typed, or `None` on end of input.
    fn ask(&self, question: &str) -> Option<String>;
}

/// Prompts on stdout and reads one line from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&self, question: &str) -> Option<String> {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{}", question);
        let _ = stdout.flush();

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    }
}

/// Replays a fixed list of answers, then behaves like closed stdin.
/// Records every question it was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, question: &str) -> Option<String> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.to_string());
        }
        self.answers.lock().ok().and_then(|mut a| a.pop_front())
    }
}

/// Interpret a raw answer. Only `y`/`yes` and `n`/`no` (any case) are
/// recognised; empty, invalid, or missing input yields `default_yes`.
pub fn interpret_answer(answer: Option<&str>, default_yes: bool) -> bool {
    match answer.map(|a| a.trim().to_ascii_lowercase()) {
        Some(a) if a == "y" || a == "yes" => true,
        Some(a) if a == "n" || a == "no" => false,
        _ => default_yes,
    }
}

/// Ask a yes/no question with the given default.
pub fn confirm(prompter: &dyn Prompter, question: &str, default_yes: bool) -> bool {
    let answer = prompter.ask(question);
    interpret_answer(answer.as_deref(), default_yes)
}

// =============================================================================
// Gate
// =============================================================================

/// What the gate requires before a command may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Run without asking.
    Proceed,
    /// Denylisted: run only on an explicit yes.
    ConfirmDangerous,
    /// Opted out of auto-execution: run unless the user says no.
    Confirm,
}

/// Result of consulting the gate for a concrete command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Approved,
    Declined,
}

/// Decides whether a command needs confirmation and collects it.
pub struct SafetyGate {
    recursive_force_remove: RecursiveForceRemove,
    patterns: Vec<Regex>,
}

impl SafetyGate {
    /// Build a gate from the built-in denylist plus configured extras.
    pub fn new(config: &SafetyConfig) -> Result<Self, GateError> {
        let mut patterns = Vec::with_capacity(BUILTIN_PATTERNS.len());
        let sources = BUILTIN_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .chain(config.extra_dangerous_patterns.iter().cloned());

        for pattern in sources {
            patterns.push(compile(&pattern)?);
        }
        Ok(Self {
            recursive_force_remove: RecursiveForceRemove::new()?,
            patterns,
        })
    }

    /// Whether `command` matches the destructive denylist.
    pub fn is_dangerous(&self, command: &str) -> bool {
        self.recursive_force_remove.is_match(command)
            || self.patterns.iter().any(|p| p.is_match(command))
    }

    /// Classify a command. The denylist takes precedence over `auto_execute`.
    pub fn evaluate(&self, command: &str, auto_execute: bool) -> GateDecision {
        if self.is_dangerous(command) {
            GateDecision::ConfirmDangerous
        } else if !auto_execute {
            GateDecision::Confirm
        } else {
            GateDecision::Proceed
        }
    }

    /// Evaluate and, if needed, ask the user.
    pub fn authorize(
        &self,
        command: &str,
        auto_execute: bool,
        prompter: &dyn Prompter,
    ) -> Authorization {
        let approved = match self.evaluate(command, auto_execute) {
            GateDecision::Proceed => true,
            GateDecision::ConfirmDangerous => {
                tracing::warn!(command = %command, "Command matches destructive pattern");
                confirm(prompter, DANGEROUS_PROMPT, false)
            }
            GateDecision::Confirm => confirm(prompter, CONFIRM_PROMPT, true),
        };
        if approved {
            Authorization::Approved
        } else {
            Authorization::Declined
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> SafetyGate {
        SafetyGate::new(&SafetyConfig::default()).unwrap()
    }

    const DANGEROUS: &[&str] = &[
        "rm -rf /",
        "rm -fr ~/projects",
        "sudo rm -Rf /var/lib",
        "rm -r -f build",
        "rm -f -r build",
        "rm --recursive --force node_modules",
        "rm -r --force build",
        "rm --force -r build",
        "rm --recursive -f build",
        "rm -f --recursive build",
        "rm -R build -f",
        "cd / && rm -rvf tmp",
        "mkfs.ext4 /dev/sdb1",
        "mkfs -t vfat /dev/sdc",
        "fdisk /dev/sda",
        "wipefs -a /dev/sdb",
        "shutdown -h now",
        "sudo reboot",
        "sync && reboot",
        "poweroff",
        "init 0",
        "sudo init 6",
        "dd if=/dev/zero of=/dev/sda bs=1M",
        "dd if=disk.img of=/dev/mmcblk0",
        "cat image.iso > /dev/sdb",
    ];

    const SAFE: &[&str] = &[
        "ls -la",
        "rm file.txt",
        "rm -r build",
        "rm -f stale.lock",
        "rm -r build && ls -f",
        "rm --force-interactive x",
        "git status",
        "git commit -m 'halt the build'",
        "echo reboot required",
        "dd if=/dev/zero of=/dev/null bs=1M count=1",
        "echo format",
        "dd if=input.img of=backup.img",
        "cat notes > /dev/null",
        "python3 platform_rm_helper.py",
        "cargo build --release",
    ];

    // ---- denylist ----

    #[test]
    fn test_dangerous_patterns_match() {
        let gate = gate();
        for cmd in DANGEROUS {
            assert!(gate.is_dangerous(cmd), "expected dangerous: {}", cmd);
        }
    }

    #[test]
    fn test_safe_commands_do_not_match() {
        let gate = gate();
        for cmd in SAFE {
            assert!(!gate.is_dangerous(cmd), "expected safe: {}", cmd);
        }
    }

    #[test]
    fn test_extra_patterns_from_config() {
        let config = SafetyConfig {
            extra_dangerous_patterns: vec![r"\bgit\s+push\s+--force\b".to_string()],
        };
        let gate = SafetyGate::new(&config).unwrap();
        assert!(gate.is_dangerous("git push --force origin main"));
        assert!(!gate.is_dangerous("git push origin main"));
    }

    #[test]
    fn test_invalid_extra_pattern_is_error() {
        let config = SafetyConfig {
            extra_dangerous_patterns: vec!["(unclosed".to_string()],
        };
        let err = SafetyGate::new(&config).err().unwrap();
        assert!(matches!(err, GateError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
    }

    // ---- evaluate ----

    #[test]
    fn test_evaluate_tiers() {
        let gate = gate();
        assert_eq!(gate.evaluate("ls", true), GateDecision::Proceed);
        assert_eq!(gate.evaluate("ls", false), GateDecision::Confirm);
        assert_eq!(gate.evaluate("rm -rf /", true), GateDecision::ConfirmDangerous);
        // dangerous wins over auto_execute=false
        assert_eq!(gate.evaluate("rm -rf /", false), GateDecision::ConfirmDangerous);
    }

    // ---- answers ----

    #[test]
    fn test_interpret_answer() {
        assert!(interpret_answer(Some("y\n"), false));
        assert!(interpret_answer(Some("YES"), false));
        assert!(!interpret_answer(Some("n"), true));
        assert!(!interpret_answer(Some(" No \n"), true));
        assert!(interpret_answer(Some(""), true));
        assert!(!interpret_answer(Some(""), false));
        assert!(interpret_answer(Some("maybe"), true));
        assert!(!interpret_answer(Some("maybe"), false));
        assert!(interpret_answer(None, true));
        assert!(!interpret_answer(None, false));
    }

    // ---- authorize ----

    #[test]
    fn test_dangerous_declines_on_empty_or_invalid_input() {
        let gate = gate();
        for answer in ["", "\n", "sure", "1", "yep"] {
            for cmd in DANGEROUS {
                let prompter = ScriptedPrompter::new([answer]);
                assert_eq!(
                    gate.authorize(cmd, true, &prompter),
                    Authorization::Declined,
                    "{} with answer {:?}",
                    cmd,
                    answer
                );
                assert_eq!(prompter.asked(), vec![DANGEROUS_PROMPT.to_string()]);
            }
        }
    }

    #[test]
    fn test_dangerous_declines_on_eof() {
        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        assert_eq!(
            gate().authorize("rm -rf /", true, &prompter),
            Authorization::Declined
        );
    }

    #[test]
    fn test_dangerous_runs_on_explicit_yes() {
        let prompter = ScriptedPrompter::new(["Y"]);
        assert_eq!(
            gate().authorize("rm -rf build", true, &prompter),
            Authorization::Approved
        );
    }

    #[test]
    fn test_opt_out_accepts_on_empty_or_invalid_input() {
        let gate = gate();
        for answer in ["", "\n", "whatever", "1"] {
            for cmd in SAFE {
                let prompter = ScriptedPrompter::new([answer]);
                assert_eq!(
                    gate.authorize(cmd, false, &prompter),
                    Authorization::Approved,
                    "{} with answer {:?}",
                    cmd,
                    answer
                );
                assert_eq!(prompter.asked(), vec![CONFIRM_PROMPT.to_string()]);
            }
        }
    }

    #[test]
    fn test_opt_out_declines_on_explicit_no() {
        let prompter = ScriptedPrompter::new(["n"]);
        assert_eq!(
            gate().authorize("make install", false, &prompter),
            Authorization::Declined
        );
    }

    #[test]
    fn test_dangerous_and_opt_out_uses_strict_prompt() {
        let prompter = ScriptedPrompter::new([""]);
        assert_eq!(
            gate().authorize("rm -rf /tmp/x", false, &prompter),
            Authorization::Declined
        );
        assert_eq!(prompter.asked(), vec![DANGEROUS_PROMPT.to_string()]);
    }

    #[test]
    fn test_auto_execute_does_not_prompt() {
        let prompter = ScriptedPrompter::new(["n"]);
        assert_eq!(
            gate().authorize("echo hi", true, &prompter),
            Authorization::Approved
        );
        assert!(prompter.asked().is_empty());
    }
}
