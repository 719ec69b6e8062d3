//! Core types for the action engine.
//!
//! Defines the wire-level action descriptor emitted by the backend and the
//! closed [`Action`] sum type the dispatcher routes on.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::executor::shell_quote;

// =============================================================================
// Enums
// =============================================================================

/// The recognised action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Text,
    Error,
    Command,
    Run,
    CompileAndRun,
    WriteFile,
    Configure,
    Install,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Text => write!(f, "text"),
            ActionKind::Error => write!(f, "error"),
            ActionKind::Command => write!(f, "command"),
            ActionKind::Run => write!(f, "run"),
            ActionKind::CompileAndRun => write!(f, "compile_and_run"),
            ActionKind::WriteFile => write!(f, "write_file"),
            ActionKind::Configure => write!(f, "configure"),
            ActionKind::Install => write!(f, "install"),
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    /// Accepts the canonical names plus the short forms the backend prompt
    /// uses (`cmd`, `file`, `config`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ActionKind::Text),
            "error" => Ok(ActionKind::Error),
            "command" | "cmd" => Ok(ActionKind::Command),
            "run" => Ok(ActionKind::Run),
            "compile_and_run" => Ok(ActionKind::CompileAndRun),
            "write_file" | "file" => Ok(ActionKind::WriteFile),
            "configure" | "config" => Ok(ActionKind::Configure),
            "install" => Ok(ActionKind::Install),
            _ => Err(format!("Unknown action kind: {}", s)),
        }
    }
}

// =============================================================================
// Wire descriptor
// =============================================================================

/// Program arguments, either a ready-made argument string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgList {
    Line(String),
    List(Vec<String>),
}

impl ArgList {
    /// Render as a single shell argument string.
    pub fn to_command_line(&self) -> String {
        match self {
            ArgList::Line(line) => line.clone(),
            ArgList::List(items) => items
                .iter()
                .map(|item| shell_quote(item))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// One action object exactly as the backend emits it. Every field is
/// optional; [`Action::from_descriptor`] applies the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionDescriptor {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Older backends tag actions with `kind`. `type` wins when both are set.
    #[serde(rename = "kind", skip_serializing_if = "Option::is_none")]
    pub kind_alias: Option<String>,
    pub content: Option<String>,
    pub command: Option<String>,
    pub path: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub auto_execute: Option<bool>,
    pub executable: Option<String>,
    pub args: Option<ArgList>,
    #[serde(deserialize_with = "lenient_bool")]
    pub background: Option<bool>,
    pub source: Option<String>,
    pub compile_command: Option<String>,
    pub run_command: Option<String>,
    pub append: Option<String>,
    #[serde(deserialize_with = "package_list")]
    pub packages: Vec<String>,
    pub manager: Option<String>,
}

/// Accepts JSON booleans plus the `"true"`/`"false"`, `"yes"`/`"no"` and
/// `0`/`1` spellings models tend to emit. Anything else counts as unset.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Some(Value::Number(n)) => n.as_i64().map(|n| n != 0),
        _ => None,
    })
}

/// A list of names, a single string of whitespace- or comma-separated
/// names, or `null`.
fn package_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(serde::de::Error::custom(format!(
                    "package name must be a string, got {}",
                    other
                ))),
            })
            .collect(),
        Some(other) => Err(serde::de::Error::custom(format!(
            "packages must be a list of names, got {}",
            other
        ))),
    }
}

// =============================================================================
// Typed action
// =============================================================================

/// A typed unit of work, one variant per [`ActionKind`].
///
/// Descriptors with an unrecognised or missing kind become
/// [`Action::Unknown`] and are skipped by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Text {
        content: String,
    },
    Error {
        content: String,
    },
    Command {
        command: String,
        auto_execute: bool,
    },
    Run {
        executable: String,
        args: String,
        background: bool,
    },
    CompileAndRun {
        source: String,
        compile_command: String,
        run_command: String,
        auto_execute: bool,
    },
    WriteFile {
        path: String,
        content: String,
    },
    Configure {
        path: String,
        append: String,
    },
    Install {
        packages: Vec<String>,
        manager: Option<String>,
    },
    Unknown {
        kind: String,
    },
}

impl Action {
    /// Build a typed action from a descriptor, applying field defaults.
    pub fn from_descriptor(d: ActionDescriptor) -> Self {
        let raw_kind = d.kind.or(d.kind_alias).unwrap_or_default();
        let kind = match raw_kind.parse::<ActionKind>() {
            Ok(kind) => kind,
            Err(_) => return Action::Unknown { kind: raw_kind },
        };
        let auto_execute = d.auto_execute.unwrap_or(true);

        match kind {
            ActionKind::Text => Action::Text {
                content: d.content.unwrap_or_default(),
            },
            ActionKind::Error => Action::Error {
                content: d.content.unwrap_or_default(),
            },
            ActionKind::Command => Action::Command {
                command: d.command.unwrap_or_default(),
                auto_execute,
            },
            ActionKind::Run => Action::Run {
                executable: d.executable.unwrap_or_default(),
                args: d.args.map(|a| a.to_command_line()).unwrap_or_default(),
                background: d.background.unwrap_or(false),
            },
            ActionKind::CompileAndRun => Action::CompileAndRun {
                source: d.source.unwrap_or_default(),
                compile_command: d.compile_command.unwrap_or_default(),
                run_command: d.run_command.unwrap_or_default(),
                auto_execute,
            },
            ActionKind::WriteFile => Action::WriteFile {
                path: d.path.unwrap_or_default(),
                content: d.content.unwrap_or_default(),
            },
            ActionKind::Configure => Action::Configure {
                path: d.path.unwrap_or_default(),
                append: d.append.or(d.content).unwrap_or_default(),
            },
            ActionKind::Install => Action::Install {
                packages: d.packages,
                manager: d.manager.filter(|m| !m.trim().is_empty()),
            },
        }
    }

    /// Parse a single JSON value. Anything that is not a well-formed action
    /// object becomes [`Action::Unknown`].
    pub fn from_value(value: serde_json::Value) -> Self {
        match serde_json::from_value::<ActionDescriptor>(value) {
            Ok(descriptor) => Self::from_descriptor(descriptor),
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable action descriptor, skipping");
                Action::Unknown {
                    kind: String::new(),
                }
            }
        }
    }

    /// The recognised kind, or `None` for [`Action::Unknown`].
    pub fn kind(&self) -> Option<ActionKind> {
        match self {
            Action::Text { .. } => Some(ActionKind::Text),
            Action::Error { .. } => Some(ActionKind::Error),
            Action::Command { .. } => Some(ActionKind::Command),
            Action::Run { .. } => Some(ActionKind::Run),
            Action::CompileAndRun { .. } => Some(ActionKind::CompileAndRun),
            Action::WriteFile { .. } => Some(ActionKind::WriteFile),
            Action::Configure { .. } => Some(ActionKind::Configure),
            Action::Install { .. } => Some(ActionKind::Install),
            Action::Unknown { .. } => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
