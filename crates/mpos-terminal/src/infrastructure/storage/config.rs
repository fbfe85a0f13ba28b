//! TOML-based application configuration for the terminal.
//!
//! Reads `AppConfig` from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\MposTerminal\config.toml`
//! - Linux:    `~/.config/mpos-terminal/config.toml`
//! - macOS:    `~/Library/Application Support/MposTerminal/config.toml`
//!
//! This file holds *operator* settings: log level, which reader family to
//! show during discovery, where the session document lives, and the factory
//! default credentials used by "restore defaults".  The user's own session
//! (credentials per environment, tags, split transfers) is a separate JSON
//! document owned by the [`ConfigStore`](super::session_store::ConfigStore).
//!
//! ```toml
//! [terminal]
//! log_level = "debug"
//! device_name_prefix = "D135"
//!
//! [storage]
//! session_file = "/var/lib/mpos/session.json"
//!
//! [defaults]
//! selected_environment = "Sandbox"
//!
//! [defaults.sandbox]
//! username = "USsandbox"
//! password = "secret"
//! merchantId = "MUsandbox"
//! merchantMid = "MIDsandbox"
//! deviceId = "DVsandbox"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent, so a missing or partial file
//! still yields a working configuration.

use std::path::{Path, PathBuf};

use mpos_core::{AllEnvironmentConfigurations, Environment, EnvironmentConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// General terminal behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerminalConfig {
    /// Schema version string; bump when breaking changes are introduced.
    #[serde(default = "default_version")]
    pub version: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Only readers whose advertised name starts with this are listed.
    #[serde(default = "default_device_name_prefix")]
    pub device_name_prefix: String,
}

/// Location of the persisted session document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Defaults to `session.json` next to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,
}

/// Factory environment configuration used on first run and by
/// "restore defaults".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub selected_environment: Environment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<EnvironmentConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<EnvironmentConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa: Option<EnvironmentConfig>,
}

impl DefaultsConfig {
    /// Builds the default configuration of every environment.
    ///
    /// Environments without a table are left out and read back as empty.
    pub fn to_configurations(&self) -> AllEnvironmentConfigurations {
        let mut all = AllEnvironmentConfigurations::default();
        let tables = [
            (Environment::Production, &self.production),
            (Environment::Sandbox, &self.sandbox),
            (Environment::Qa, &self.qa),
        ];
        for (env, table) in tables {
            if let Some(config) = table {
                all.set(env, config.clone());
            }
        }
        all.select(self.selected_environment);
        all
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_version() -> String {
    "1.0".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_device_name_prefix() -> String {
    "D135".to_string()
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            log_level: default_log_level(),
            device_name_prefix: default_device_name_prefix(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Resolves where the session document is stored.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when no path is configured and
/// the platform directory cannot be determined.
pub fn session_file_path(config: &AppConfig) -> Result<PathBuf, ConfigError> {
    match &config.storage.session_file {
        Some(path) => Ok(path.clone()),
        None => Ok(config_dir()?.join("session.json")),
    }
}

/// Loads `AppConfig` from `path`, or from the platform config file when
/// `path` is `None`.  Returns `AppConfig::default()` if the file does not
/// exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("MposTerminal"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("mpos-terminal"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("MposTerminal")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
