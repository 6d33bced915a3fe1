//! TOML-based configuration persistence.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\hidkb\config.toml`
//! - Linux:    `~/.config/hidkb/config.toml`
//! - macOS:    `~/Library/Application Support/hidkb/config.toml`
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file, so the engine
//! works on first run (before a config file exists) and when upgrading from
//! an older file missing newer fields.

use std::path::PathBuf;

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

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub typing: TypingConfig,
    /// Known bonded devices seeded into the registry at startup.
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// General engine behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Name the keyboard registers under; hosts show it in their device list.
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Settle delay in milliseconds between a bonding event completing and
    /// issuing the deferred connect call.  Connecting immediately after
    /// bonding is unreliable on real stacks.
    #[serde(default = "default_settle_delay_ms")]
    pub bond_settle_delay_ms: u64,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Default typing cadence, applied when the caller does not override it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypingConfig {
    /// Base per-character delay in milliseconds, within `[5, 200]`.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Add random 5–50 ms jitter to every keystroke.
    #[serde(default)]
    pub letter_jitter: bool,
    /// Add a random 5–400 ms pause after each word.
    #[serde(default)]
    pub word_pause: bool,
}

/// Persisted record of a known bonded host device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceEntry {
    /// Hardware address, e.g. `"AA:BB:CC:DD:EE:FF"`.
    pub address: String,
    /// Display name shown in listings.
    pub name: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_device_name() -> String {
    "hidkb keyboard".to_string()
}
fn default_settle_delay_ms() -> u64 {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_delay_ms() -> u64 {
    25
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            bond_settle_delay_ms: default_settle_delay_ms(),
            log_level: default_log_level(),
        }
    }
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            letter_jitter: false,
            word_pause: false,
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
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot
/// be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads [`AppConfig`] from disk, returning `AppConfig::default()` if the
/// file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to disk, creating the config directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    let path = config_file_path()?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory including the `hidkb` subdir.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("hidkb"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("hidkb"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("hidkb")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
