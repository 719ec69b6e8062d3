//! Environment snapshot handed to the backend alongside the previous
//! session's outcome log.

use std::fmt;
use std::path::{Path, PathBuf};

use termai_core::config::is_termux;

/// Directory entries listed in a snapshot.
const MAX_ENTRIES: usize = 15;

/// Package managers probed on `PATH`.
const PACKAGE_MANAGERS: &[&str] = &["pkg", "apt", "pip3", "npm"];

/// Marker file → project type, checked in order.
const PROJECT_MARKERS: &[(&str, &str)] = &[
    ("package.json", "nodejs"),
    ("requirements.txt", "python"),
    ("pyproject.toml", "python"),
    ("Cargo.toml", "rust"),
    ("go.mod", "go"),
    ("Makefile", "c/cpp"),
    ("CMakeLists.txt", "cmake"),
    ("config.fish", "fish_config"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    pub cwd: PathBuf,
    /// `name (NB)` for files, `name/` for directories.
    pub entries: Vec<String>,
    pub project_type: String,
    pub platform: String,
    pub termux: bool,
    pub shell: String,
    pub user: String,
    pub home: String,
    pub package_managers: Vec<String>,
}

impl EnvironmentSnapshot {
    /// Describe `cwd` and the current process environment.
    pub fn gather(cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            entries: list_entries(cwd),
            project_type: detect_project(cwd).to_string(),
            platform: std::env::consts::OS.to_string(),
            termux: is_termux(),
            shell: std::env::var("SHELL")
                .ok()
                .and_then(|s| s.rsplit('/').next().map(str::to_string))
                .unwrap_or_default(),
            user: std::env::var("USER")
                .or_else(|_| std::env::var("LOGNAME"))
                .unwrap_or_else(|_| "unknown".to_string()),
            home: dirs::home_dir()
                .map(|h| h.display().to_string())
                .unwrap_or_default(),
            package_managers: PACKAGE_MANAGERS
                .iter()
                .filter(|m| on_path(m))
                .map(|m| m.to_string())
                .collect(),
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EnvironmentSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cwd: {}", self.cwd.display())?;
        writeln!(f, "files: {}", self.entries.join(", "))?;
        writeln!(f, "project_type: {}", self.project_type)?;
        writeln!(f, "platform: {}", self.platform)?;
        writeln!(f, "termux: {}", self.termux)?;
        writeln!(f, "shell: {}", self.shell)?;
        writeln!(f, "user: {}", self.user)?;
        writeln!(f, "home: {}", self.home)?;
        writeln!(f, "package_managers: {}", self.package_managers.join(", "))
    }
}

fn list_entries(dir: &Path) -> Vec<String> {
    let read = match std::fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "Cannot list directory");
            return Vec::new();
        }
    };

    let mut entries: Vec<(String, Option<u64>)> = read
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                return None;
            }
            let meta = e.metadata().ok()?;
            Some((name, meta.is_file().then(|| meta.len())))
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    entries
        .into_iter()
        .take(MAX_ENTRIES)
        .map(|(name, size)| match size {
            Some(size) => format!("{} ({}B)", name, size),
            None => format!("{}/", name),
        })
        .collect()
}

fn detect_project(dir: &Path) -> &'static str {
    PROJECT_MARKERS
        .iter()
        .find(|(marker, _)| dir.join(marker).exists())
        .map(|(_, kind)| *kind)
        .unwrap_or("general")
}

fn on_path(program: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}
