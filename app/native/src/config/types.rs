//! Configuration types for Pushbridge.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::completion::FetchResult;

/// How device tokens are encoded in registration events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenEncoding {
    /// Lowercase hexadecimal, the form push providers expect. This is the default.
    #[default]
    Hex,
    /// Standard base64.
    Base64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `tracing` env-filter directive. `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { level: "info".to_string() } }
}

/// Remote notification registration configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistrationConfig {
    /// Encoding of `deviceToken` in registration events.
    pub token_encoding: TokenEncoding,
}

/// Silent (content-available) notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SilentNotificationConfig {
    /// Result reported for notifications still unfinished when the manager is torn down.
    pub default_fetch_result: FetchResult,

    /// How long [`ContentAvailableManager::await_completion`] waits for the
    /// application to finish a background fetch.
    ///
    /// [`ContentAvailableManager::await_completion`]: crate::managers::ContentAvailableManager::await_completion
    ///
    /// The OS allows roughly 30 seconds; the default leaves a margin.
    pub completion_timeout_secs: u64,
}

impl Default for SilentNotificationConfig {
    fn default() -> Self {
        Self {
            default_fetch_result: FetchResult::NoData,
            completion_timeout_secs: 25,
        }
    }
}

impl SilentNotificationConfig {
    /// The completion budget as a [`Duration`](std::time::Duration).
    #[must_use]
    pub const fn completion_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.completion_timeout_secs)
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    pub logging: LoggingConfig,
    pub registration: RegistrationConfig,
    pub silent_notifications: SilentNotificationConfig,
}

/// Errors that can occur when loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error(
        "No configuration file found. Expected at ~/.config/pushbridge/config.json or the \
         platform configuration directory"
    )]
    NotFound,
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/pushbridge/` if the variable is set
/// 2. `~/.config/pushbridge/`
/// 3. The platform configuration directory (`~/Library/Application Support` on macOS)
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut dirs_to_check = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        dirs_to_check.push(PathBuf::from(xdg_config).join("pushbridge"));
    }
    if let Some(home) = dirs::home_dir() {
        dirs_to_check.push(home.join(".config").join("pushbridge"));
    }
    if let Some(config_dir) = dirs::config_dir() {
        dirs_to_check.push(config_dir.join("pushbridge"));
    }

    let mut paths = Vec::new();
    for dir in dirs_to_check {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist, `IoError` if it
/// cannot be read and `ParseError` if it is not valid JSONC.
pub fn load_config_from_path(path: &Path) -> Result<(BridgeConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }
    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: BridgeConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of
/// the expected locations, or the error from the first file found.
pub fn load_config() -> Result<(BridgeConfig, PathBuf), ConfigError> {
    config_paths()
        .into_iter()
        .find(|path| path.exists())
        .map_or(Err(ConfigError::NotFound), |path| load_config_from_path(&path))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.registration.token_encoding, TokenEncoding::Hex);
        assert_eq!(config.silent_notifications.default_fetch_result, FetchResult::NoData);
        assert_eq!(config.silent_notifications.completion_timeout_secs, 25);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "registration": { "tokenEncoding": "base64" } }"#;
        let config: BridgeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.registration.token_encoding, TokenEncoding::Base64);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_fetch_result_uses_wire_name() {
        let json = r#"{
            "silentNotifications": { "defaultFetchResult": "UIBackgroundFetchResultFailed" }
        }"#;
        let config: BridgeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.silent_notifications.default_fetch_result, FetchResult::Failed);
    }

    #[test]
    fn test_load_jsonc_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                // verbose while debugging registration
                "logging": {{ "level": "pushbridge=debug" }},
                /* hosts wait less */
                "silentNotifications": {{ "completionTimeoutSecs": 10 }}
            }}"#
        )
        .unwrap();

        let (config, path) = load_config_from_path(file.path()).unwrap();
        assert_eq!(path, file.path());
        assert_eq!(config.logging.level, "pushbridge=debug");
        assert_eq!(
            config.silent_notifications.completion_timeout(),
            std::time::Duration::from_secs(10)
        );
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_from_path(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();
        let err = load_config_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_config_paths_are_unique() {
        let paths = config_paths();
        let mut deduped = paths.clone();
        deduped.dedup();
        assert_eq!(paths.len(), deduped.len());
        assert!(paths.iter().all(|p| p.to_string_lossy().contains("pushbridge")));
    }
}
