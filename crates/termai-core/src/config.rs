use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TermaiError};

/// Top-level configuration for termai.
///
/// Loaded from `~/.termai/config.toml` by default. Every section is optional
/// and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermaiConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
    #[serde(default)]
    pub install: InstallConfig,
    #[serde(default)]
    pub context: ContextConfig,
}

impl TermaiConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TermaiConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(TermaiError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No configuration file, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// How the external reasoning backend is launched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Program to execute.
    pub command: String,
    /// Leading arguments, placed before the per-request flags.
    pub args: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: "python3".to_string(),
            args: vec!["~/.config/fish/scripts/ai_backend.py".to_string()],
        }
    }
}

/// Safety gate tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Regexes added to the built-in destructive-command denylist.
    pub extra_dangerous_patterns: Vec<String>,
}

/// Subprocess execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Shell used for `<shell> -c <command line>`.
    pub shell: String,
    /// Stream child output to the terminal while capturing it.
    pub echo_output: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            echo_output: true,
        }
    }
}

/// Dispatcher behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    /// Ask the backend for a fix suggestion when a command fails.
    pub diagnose_failures: bool,
    /// Program prefixed to filesystem operations retried after a
    /// permission error.
    pub escalation_command: String,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            diagnose_failures: true,
            escalation_command: "sudo".to_string(),
        }
    }
}

/// Package installation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Package manager used when an install action names none.
    pub default_manager: Option<String>,
}

impl InstallConfig {
    /// The configured manager, or the platform default.
    pub fn resolve_manager(&self) -> String {
        if let Some(ref manager) = self.default_manager {
            return manager.clone();
        }
        if is_termux() {
            "pkg".to_string()
        } else if cfg!(target_os = "macos") {
            "brew".to_string()
        } else {
            "apt".to_string()
        }
    }
}

/// Where session context artifacts are stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Directory holding `ai_last_output` and `ai_deep_context`.
    pub dir: Option<String>,
}

impl ContextConfig {
    /// The configured directory, or `<cache dir>/termai`, or `<temp>/termai`.
    pub fn resolve_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.dir {
            return expand_home(dir);
        }
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("termai")
    }
}

/// Whether we are running inside Termux on Android.
pub fn is_termux() -> bool {
    std::env::var("PREFIX")
        .map(|p| p.contains("com.termux"))
        .unwrap_or(false)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Default config file path: `~/.termai/config.toml`.
pub fn default_config_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".termai").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = TermaiConfig::default();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.backend.command, "python3");
        assert_eq!(config.executor.shell, "sh");
        assert!(config.executor.echo_output);
        assert!(config.actions.diagnose_failures);
        assert_eq!(config.actions.escalation_command, "sudo");
        assert!(config.safety.extra_dangerous_patterns.is_empty());
        assert!(config.install.default_manager.is_none());
        assert!(config.context.dir.is_none());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[backend]
command = "/usr/local/bin/ai-backend"
args = []

[safety]
extra_dangerous_patterns = ["\\bgit\\s+push\\s+--force\\b"]

[executor]
shell = "bash"
echo_output = false

[actions]
diagnose_failures = false
escalation_command = "doas"

[install]
default_manager = "pip3"

[context]
dir = "/tmp/termai-ctx"
"#;
        let file = create_temp_config(content);
        let config = TermaiConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.backend.command, "/usr/local/bin/ai-backend");
        assert!(config.backend.args.is_empty());
        assert_eq!(config.safety.extra_dangerous_patterns.len(), 1);
        assert_eq!(config.executor.shell, "bash");
        assert!(!config.executor.echo_output);
        assert!(!config.actions.diagnose_failures);
        assert_eq!(config.actions.escalation_command, "doas");
        assert_eq!(config.install.resolve_manager(), "pip3");
        assert_eq!(config.context.resolve_dir(), PathBuf::from("/tmp/termai-ctx"));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[executor]
echo_output = false
"#;
        let file = create_temp_config(content);
        let config = TermaiConfig::load(file.path()).unwrap();
        assert!(!config.executor.echo_output);
        assert_eq!(config.executor.shell, "sh");
        assert_eq!(config.backend.command, "python3");
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = TermaiConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.actions.escalation_command, "sudo");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = TermaiConfig::load(file.path());
        assert!(matches!(result, Err(TermaiError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = TermaiConfig::load_or_default(Path::new("/nonexistent/termai/config.toml"));
        assert_eq!(config.backend.command, "python3");
    }

    #[test]
    fn test_load_or_default_invalid_file() {
        let file = create_temp_config("[executor\nshell = ");
        let config = TermaiConfig::load_or_default(file.path());
        assert_eq!(config.executor.shell, "sh");
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let mut config = TermaiConfig::default();
        config.install.default_manager = Some("npm".to_string());
        config.save(&path).unwrap();

        let reloaded = TermaiConfig::load(&path).unwrap();
        assert_eq!(reloaded.install.default_manager.as_deref(), Some("npm"));
        assert_eq!(reloaded.executor.shell, "sh");
    }

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home("~/.bashrc"), home.join(".bashrc"));
        assert_eq!(expand_home("~"), home);
        assert_eq!(expand_home("/etc/hosts"), PathBuf::from("/etc/hosts"));
        assert_eq!(expand_home("relative/~/x"), PathBuf::from("relative/~/x"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
    }

    #[test]
    fn test_resolve_dir_default_ends_with_termai() {
        let dir = ContextConfig::default().resolve_dir();
        assert!(dir.ends_with("termai"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with(".termai/config.toml"));
    }
}
