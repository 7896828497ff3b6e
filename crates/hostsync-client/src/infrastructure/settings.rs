//! TOML-based persistence for client-side settings.
//!
//! Reads and writes [`ClientSettings`] at the platform-appropriate location:
//! - Windows:  `%APPDATA%\HostSync\settings.toml`
//! - Linux:    `~/.config/hostsync/settings.toml`
//! - macOS:    `~/Library/Application Support/HostSync/settings.toml`
//!
//! Fields annotated with `#[serde(default = "…")]` fall back to their
//! defaults when absent, so the file can be missing entirely (first run) or
//! written by an older version without breaking anything.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be serialized to TOML.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Settings schema ───────────────────────────────────────────────────────────

/// Top-level client settings stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientSettings {
    pub general: GeneralSettings,
    pub startup: StartupSettings,
}

/// General behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralSettings {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    /// Overridable at runtime via `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// What happens right after the application starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartupSettings {
    /// Whether remote sources with `startup` frequency are refreshed after
    /// launch.
    #[serde(default = "default_true")]
    pub refresh_startup_sources: bool,
    /// Seconds to wait after initialization before that refresh, so launch
    /// is never gated on the network.
    #[serde(default = "default_refresh_delay_secs")]
    pub refresh_delay_secs: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_refresh_delay_secs() -> u64 {
    3
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            startup: StartupSettings::default(),
        }
    }
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for StartupSettings {
    fn default() -> Self {
        Self {
            refresh_startup_sources: default_true(),
            refresh_delay_secs: default_refresh_delay_secs(),
        }
    }
}

// ── Settings repository ───────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the settings file.
///
/// # Errors
///
/// Returns [`SettingsError::NoPlatformConfigDir`] when the base directory
/// cannot be determined from the environment.
pub fn settings_dir() -> Result<PathBuf, SettingsError> {
    platform_config_dir().ok_or(SettingsError::NoPlatformConfigDir)
}

/// Resolves the full path to the settings file.
pub fn settings_file_path() -> Result<PathBuf, SettingsError> {
    Ok(settings_dir()?.join("settings.toml"))
}

/// Loads [`ClientSettings`] from the platform path, returning defaults if
/// the file does not yet exist.
pub fn load_settings() -> Result<ClientSettings, SettingsError> {
    load_settings_from(&settings_file_path()?)
}

/// Loads settings from an explicit path (used by tests).
pub fn load_settings_from(path: &Path) -> Result<ClientSettings, SettingsError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let settings: ClientSettings = toml::from_str(&content)?;
            Ok(settings)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientSettings::default()),
        Err(e) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `settings` to the platform path, creating the directory first.
pub fn save_settings(settings: &ClientSettings) -> Result<(), SettingsError> {
    save_settings_to(settings, &settings_file_path()?)
}

/// Persists settings to an explicit path (used by tests).
pub fn save_settings_to(settings: &ClientSettings, path: &Path) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory including the app folder.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("HostSync"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("hostsync"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("HostSync")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("hostsync-settings-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_defaults_refresh_startup_sources_after_three_seconds() {
        let settings = ClientSettings::default();
        assert_eq!(settings.general.log_level, "info");
        assert!(settings.startup.refresh_startup_sources);
        assert_eq!(settings.startup.refresh_delay_secs, 3);
    }

    #[test]
    fn test_missing_file_loads_as_defaults() {
        let path = scratch_path("nonexistent.toml");
        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings, ClientSettings::default());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let path = scratch_path("settings.toml");
        let mut settings = ClientSettings::default();
        settings.general.log_level = "debug".to_string();
        settings.startup.refresh_delay_secs = 10;

        save_settings_to(&settings, &path).unwrap();
        let restored = load_settings_from(&path).unwrap();

        assert_eq!(settings, restored);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_partial_file_fills_missing_fields_with_defaults() {
        let path = scratch_path("partial.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[general]\nlog_level = \"trace\"\n\n[startup]\n").unwrap();

        let settings = load_settings_from(&path).unwrap();

        assert_eq!(settings.general.log_level, "trace");
        assert!(settings.startup.refresh_startup_sources, "default applied");
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let path = scratch_path("broken.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "this is { not toml").unwrap();

        assert!(matches!(
            load_settings_from(&path),
            Err(SettingsError::Parse(_))
        ));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
