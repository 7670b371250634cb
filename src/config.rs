//! Configuration for floortrack.
//!
//! Settings are read from `floortrack.toml` (by default in the user config
//! directory) and layered: file → environment → CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! base_url = "https://tracking.example.com"
//! timeout_secs = 10
//!
//! [storage]
//! data_dir = "/var/lib/floortrack"
//!
//! [logging]
//! level = "info"
//! log_dir = "/var/log/floortrack"
//! ship_remote = true
//!
//! [polling]
//! jobs_secs = 30
//! stations_secs = 60
//! timeline_secs = 30
//! factory_secs = 5
//! ```
//!
//! Environment overrides: `FLOORTRACK_API_URL`, `FLOORTRACK_DATA_DIR`,
//! `FLOORTRACK_LOG_LEVEL`. A `.env` file in the working directory is loaded
//! first.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "floortrack.toml";
pub const APP_DIR: &str = "floortrack";

pub const ENV_API_URL: &str = "FLOORTRACK_API_URL";
pub const ENV_DATA_DIR: &str = "FLOORTRACK_DATA_DIR";
pub const ENV_LOG_LEVEL: &str = "FLOORTRACK_LOG_LEVEL";

const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Session token and view preferences (default: user data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Rotated log files (default: `<data_dir>/logs`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// Ship log entries to the backend's log endpoints
    #[serde(default)]
    pub ship_remote: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
            ship_remote: false,
        }
    }
}

/// Refresh intervals of the watch commands, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_jobs_secs")]
    pub jobs_secs: u64,
    #[serde(default = "default_stations_secs")]
    pub stations_secs: u64,
    #[serde(default = "default_timeline_secs")]
    pub timeline_secs: u64,
    #[serde(default = "default_factory_secs")]
    pub factory_secs: u64,
}

fn default_jobs_secs() -> u64 {
    30
}

fn default_stations_secs() -> u64 {
    60
}

fn default_timeline_secs() -> u64 {
    30
}

fn default_factory_secs() -> u64 {
    5
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            jobs_secs: default_jobs_secs(),
            stations_secs: default_stations_secs(),
            timeline_secs: default_timeline_secs(),
            factory_secs: default_factory_secs(),
        }
    }
}

/// Contents of `floortrack.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FloortrackToml {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

impl FloortrackToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse floortrack.toml")
    }

    /// Returns default configuration if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content =
            toml::to_string_pretty(self).context("Failed to serialize floortrack.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        warnings.extend(base_url_warning(&self.api.base_url));

        if self.api.timeout_secs == 0 {
            warnings.push("api.timeout_secs is 0: every request will time out".to_string());
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            warnings.push(format!(
                "Invalid logging.level '{}': expected one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }

        for (name, secs) in [
            ("jobs_secs", self.polling.jobs_secs),
            ("stations_secs", self.polling.stations_secs),
            ("timeline_secs", self.polling.timeline_secs),
            ("factory_secs", self.polling.factory_secs),
        ] {
            if secs == 0 {
                warnings.push(format!("polling.{} is 0: watch mode would spin", name));
            }
        }

        warnings
    }
}

fn base_url_warning(base_url: &str) -> Option<String> {
    let url = match reqwest::Url::parse(base_url) {
        Ok(url) => url,
        Err(_) => return Some(format!("Invalid api.base_url '{}'", base_url)),
    };
    match url.scheme() {
        "https" => None,
        "http" => {
            let local = matches!(
                url.host_str(),
                Some("localhost") | Some("127.0.0.1") | Some("[::1]") | Some("::1")
            );
            (!local).then(|| {
                format!(
                    "api.base_url '{}' uses plain HTTP to a remote host: credentials are sent unencrypted",
                    base_url
                )
            })
        }
        other => Some(format!(
            "api.base_url '{}' has unsupported scheme '{}'",
            base_url, other
        )),
    }
}

/// Default location of `floortrack.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Effective configuration after applying environment and CLI overrides.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path the file was (or would be) read from
    pub path: PathBuf,
    /// Parsed file contents, without overrides
    pub toml: FloortrackToml,
    pub base_url: String,
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl Config {
    /// Load from `path` (or the default path) and apply process
    /// environment overrides.
    pub fn load(path: Option<&Path>, cli_api_url: Option<&str>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let toml = FloortrackToml::load_or_default(&path)?;
        Ok(Self::resolve(path, toml, |key| std::env::var(key).ok(), cli_api_url))
    }

    /// Apply overrides: file → `env` → CLI.
    pub fn resolve(
        path: PathBuf,
        toml: FloortrackToml,
        env: impl Fn(&str) -> Option<String>,
        cli_api_url: Option<&str>,
    ) -> Self {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let base_url = cli_api_url
            .map(str::to_string)
            .or_else(|| non_empty(ENV_API_URL))
            .unwrap_or_else(|| toml.api.base_url.clone());
        let data_dir = non_empty(ENV_DATA_DIR)
            .map(PathBuf::from)
            .or_else(|| toml.storage.data_dir.clone())
            .unwrap_or_else(default_data_dir);
        let log_level = non_empty(ENV_LOG_LEVEL).unwrap_or_else(|| toml.logging.level.clone());

        Self {
            path,
            toml,
            base_url,
            data_dir,
            log_level,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.toml.api.timeout_secs)
    }

    /// Logging settings with the log directory resolved.
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            log_dir: Some(
                self.toml
                    .logging
                    .log_dir
                    .clone()
                    .unwrap_or_else(|| self.data_dir.join("logs")),
            ),
            ship_remote: self.toml.logging.ship_remote,
        }
    }

    pub fn polling(&self) -> &PollingConfig {
        &self.toml.polling
    }

    /// Warnings for the effective values.
    pub fn validate(&self) -> Vec<String> {
        let mut effective = self.toml.clone();
        effective.api.base_url = self.base_url.clone();
        effective.logging.level = self.log_level.clone();
        effective.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // =========================================
    // Parsing
    // =========================================

    #[test]
    fn test_parse_empty_uses_defaults() {
        let toml = FloortrackToml::parse("").unwrap();
        assert_eq!(toml, FloortrackToml::default());
        assert_eq!(toml.api.base_url, "http://localhost:8000");
        assert_eq!(toml.api.timeout_secs, 10);
        assert_eq!(toml.polling.jobs_secs, 30);
        assert_eq!(toml.polling.stations_secs, 60);
        assert!(!toml.logging.ship_remote);
    }

    #[test]
    fn test_parse_partial_sections() {
        let toml = FloortrackToml::parse(
            r#"
[api]
base_url = "https://tracking.example.com"

[polling]
jobs_secs = 10
"#,
        )
        .unwrap();
        assert_eq!(toml.api.base_url, "https://tracking.example.com");
        assert_eq!(toml.api.timeout_secs, 10);
        assert_eq!(toml.polling.jobs_secs, 10);
        assert_eq!(toml.polling.timeline_secs, 30);
    }

    #[test]
    fn test_parse_invalid_toml_fails() {
        let err = FloortrackToml::parse("[api\nbase_url =").unwrap_err();
        assert!(err.to_string().contains("floortrack.toml"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut toml = FloortrackToml::default();
        toml.logging.ship_remote = true;
        toml.storage.data_dir = Some(PathBuf::from("/srv/floortrack"));
        toml.save(&path).unwrap();

        assert_eq!(FloortrackToml::load(&path).unwrap(), toml);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = TempDir::new().unwrap();
        let toml = FloortrackToml::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(toml, FloortrackToml::default());
    }

    // =========================================
    // Validation
    // =========================================

    #[test]
    fn test_defaults_are_valid() {
        assert!(FloortrackToml::default().validate().is_empty());
    }

    #[test]
    fn test_plain_http_remote_host_warns() {
        let mut toml = FloortrackToml::default();
        toml.api.base_url = "http://tracking.example.com".to_string();
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("plain HTTP"));

        toml.api.base_url = "http://127.0.0.1:8000".to_string();
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_zero_intervals_and_bad_level_warn() {
        let mut toml = FloortrackToml::default();
        toml.polling.jobs_secs = 0;
        toml.api.timeout_secs = 0;
        toml.logging.level = "loud".to_string();
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.contains("polling.jobs_secs")));
        assert!(warnings.iter().any(|w| w.contains("logging.level")));
    }

    #[test]
    fn test_invalid_base_url_warns() {
        let mut toml = FloortrackToml::default();
        toml.api.base_url = "not a url".to_string();
        assert!(toml.validate()[0].contains("Invalid api.base_url"));
    }

    // =========================================
    // Layering
    // =========================================

    #[test]
    fn test_env_overrides_file() {
        let mut toml = FloortrackToml::default();
        toml.api.base_url = "https://file.example.com".to_string();
        let config = Config::resolve(
            PathBuf::from(CONFIG_FILE),
            toml,
            env_from(&[
                (ENV_API_URL, "https://env.example.com"),
                (ENV_DATA_DIR, "/tmp/ft-data"),
                (ENV_LOG_LEVEL, "debug"),
            ]),
            None,
        );
        assert_eq!(config.base_url, "https://env.example.com");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/ft-data"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.logging().log_dir, Some(PathBuf::from("/tmp/ft-data/logs")));
    }

    #[test]
    fn test_cli_overrides_env() {
        let config = Config::resolve(
            PathBuf::from(CONFIG_FILE),
            FloortrackToml::default(),
            env_from(&[(ENV_API_URL, "https://env.example.com")]),
            Some("https://cli.example.com"),
        );
        assert_eq!(config.base_url, "https://cli.example.com");
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let config = Config::resolve(
            PathBuf::from(CONFIG_FILE),
            FloortrackToml::default(),
            env_from(&[(ENV_API_URL, "  ")]),
            None,
        );
        assert_eq!(config.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_effective_validation_uses_overrides() {
        let config = Config::resolve(
            PathBuf::from(CONFIG_FILE),
            FloortrackToml::default(),
            env_from(&[(ENV_API_URL, "http://plant-server:8000")]),
            None,
        );
        assert_eq!(config.validate().len(), 1);
    }
}
