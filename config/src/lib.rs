//! Configuration loading for the quill language server.
//!
//! Reads `~/.quill/config.toml`. Every section is optional; anything left
//! out resolves to the built-in behavior.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use quill_lsp::{ActionRule, DiagnosticEngine, ScanRule, ServerInfo};
use serde::Deserialize;

const CONFIG_DIR: &str = ".quill";
const CONFIG_FILE: &str = "config.toml";
const LOG_FILE: &str = "quill.log";

#[derive(Debug, Default, Deserialize)]
pub struct QuillConfig {
    pub log: Option<LogConfig>,
    pub server: Option<ServerConfig>,
    /// Scan rules. When present, these replace the built-in rules.
    pub rules: Option<Vec<ScanRule>>,
    /// Rule driving code actions.
    pub code_action: Option<ActionRule>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `"debug"` or
    /// `"quill_lsp=trace"`.
    pub level: Option<String>,
    /// Log file path. `${VAR}` references are expanded.
    pub file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Replace `${VAR}` with the value of `VAR`; unset variables become empty.
///
/// Unterminated `${` and empty names are kept literally.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                out.push_str(&env::var(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            Some(end) => {
                out.push_str("${}");
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

impl QuillConfig {
    /// Load the user config. `Ok(None)` when no config file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn log_level(&self) -> Option<&str> {
        self.log.as_ref()?.level.as_deref()
    }

    /// Configured log file, with `${VAR}` references expanded.
    #[must_use]
    pub fn log_file(&self) -> Option<PathBuf> {
        let file = self.log.as_ref()?.file.as_deref()?;
        Some(PathBuf::from(expand_env_vars(file)))
    }

    /// Build the diagnostic engine from the configured rules.
    #[must_use]
    pub fn diagnostic_engine(&self) -> DiagnosticEngine {
        let rules = self.rules.clone().unwrap_or_else(ScanRule::builtin);
        let action = self.code_action.clone().unwrap_or_default();
        DiagnosticEngine::new(rules, action)
    }

    /// Server identity reported from `initialize`.
    #[must_use]
    pub fn server_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        if let Some(server) = &self.server {
            if let Some(name) = &server.name {
                info.name.clone_from(name);
            }
            if let Some(version) = &server.version {
                info.version = Some(version.clone());
            }
        }
        info
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Log file locations to try, in order: `~/.quill/logs/quill.log`, then
/// `./.quill/logs/quill.log`.
#[must_use]
pub fn default_log_files() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(CONFIG_DIR).join("logs").join(LOG_FILE));
    }
    candidates.push(PathBuf::from(CONFIG_DIR).join("logs").join(LOG_FILE));
    candidates
}
