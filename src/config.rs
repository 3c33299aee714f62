//! Configuration module for the argus server.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `ARGUS_` and use double
//! underscores to separate nested levels:
//! - `ARGUS_ROOT=/srv/watched` sets `root`
//! - `ARGUS_SERVER__BIND=0.0.0.0:9000` sets `server.bind`
//! - `ARGUS_WATCH__SUBSCRIBER_BUFFER=1024` sets `watch.subscriber_buffer`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the settings file, searched upward from the cwd.
pub const CONFIG_DIR: &str = ".argus";
pub const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "ARGUS_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Directory every watched path is confined to
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// WebSocket server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Filesystem watch settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the server listens on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Seconds between keepalive pings on each connection
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Capacity of the channel between a notifier and its dispatch task
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Messages queued per subscriber before new ones are dropped
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,

    /// How long a rename waits for its other half, in milliseconds
    #[serde(default = "default_rename_window_ms")]
    pub rename_window_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `registry = "debug"`
    #[serde(default)]
    pub modules: IndexMap<String, String>,
}

fn default_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
fn default_bind() -> String {
    "127.0.0.1:8888".to_string()
}
fn default_keepalive_secs() -> u64 {
    60
}
fn default_event_buffer() -> usize {
    100
}
fn default_subscriber_buffer() -> usize {
    256
}
fn default_rename_window_ms() -> u64 {
    50
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: default_root(),
            server: ServerConfig::default(),
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            keepalive_secs: default_keepalive_secs(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
            subscriber_buffer: default_subscriber_buffer(),
            rename_window_ms: default_rename_window_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: IndexMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nesting; single underscores stay in field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.argus/settings.toml` from the current directory up to the filesystem root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.bind, "127.0.0.1:8888");
        assert_eq!(settings.server.keepalive_secs, 60);
        assert_eq!(settings.watch.event_buffer, 100);
        assert_eq!(settings.logging.default, "warn");
        assert!(settings.logging.modules.is_empty());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
root = "/srv/watched"

[server]
bind = "0.0.0.0:9001"
keepalive_secs = 15

[watch]
subscriber_buffer = 8

[logging]
default = "info"

[logging.modules]
registry = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.root, PathBuf::from("/srv/watched"));
        assert_eq!(settings.server.bind, "0.0.0.0:9001");
        assert_eq!(settings.server.keepalive_secs, 15);
        assert_eq!(settings.watch.subscriber_buffer, 8);
        // Unspecified values keep their defaults
        assert_eq!(settings.watch.rename_window_ms, 50);
        assert_eq!(settings.logging.default, "info");
        assert_eq!(settings.logging.modules["registry"], "debug");
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested/settings.toml");

        let mut settings = Settings::default();
        settings.server.keepalive_secs = 5;
        settings.watch.event_buffer = 7;

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.server.keepalive_secs, 5);
        assert_eq!(loaded.watch.event_buffer, 7);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.server, ServerConfig::default());
        assert_eq!(settings.watch, WatchConfig::default());
    }
}
