//! CLI argument definitions for termai.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::{Path, PathBuf};

use termai_core::config::default_config_path;

/// Working directories a session may not run in; sessions fall back to home.
const RESTRICTED_ROOTS: &[&str] = &["/system", "/proc", "/dev", "/sys"];

/// termai: say what you want done, and it runs in your terminal.
#[derive(Parser, Debug)]
#[command(name = "termai", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Working directory for the session.
    #[arg(long = "cwd")]
    pub cwd: Option<PathBuf>,

    /// Directory holding the persisted session context.
    #[arg(long = "context-dir")]
    pub context_dir: Option<PathBuf>,

    /// Print completions for the query and exit.
    #[arg(long = "complete")]
    pub complete: bool,

    /// Print the outcome log of the previous session and exit.
    #[arg(long = "show-context")]
    pub show_context: bool,

    /// Write a default configuration file and exit.
    #[arg(long = "init-config")]
    pub init_config: bool,

    /// What to do, in plain words.
    #[arg(
        trailing_var_arg = true,
        required_unless_present_any = ["complete", "show_context", "init_config"]
    )]
    pub query: Vec<String>,
}

impl CliArgs {
    /// Priority: --config flag > TERMAI_CONFIG env var > ~/.termai/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TERMAI_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: Option<&str>) -> String {
        self.log_level
            .clone()
            .or_else(|| config_level.map(str::to_string))
            .unwrap_or_else(|| "warn".to_string())
    }

    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }

    /// The session working directory: --cwd, else the process cwd, else home.
    pub fn resolve_working_dir(&self) -> PathBuf {
        let requested = self
            .cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(home_dir);
        restrict_working_dir(requested)
    }
}

/// Move a session out of system directories into the user's home.
pub fn restrict_working_dir(dir: PathBuf) -> PathBuf {
    if is_restricted(&dir) {
        let home = home_dir();
        tracing::info!(
            requested = %dir.display(),
            using = %home.display(),
            "Working directory is restricted, using home"
        );
        return home;
    }
    dir
}

fn is_restricted(dir: &Path) -> bool {
    RESTRICTED_ROOTS.iter().any(|root| dir.starts_with(root))
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"))
}
