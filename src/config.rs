use educonnect_core::{RemoteConfig, SyncOptions};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Timing of remote operations
#[derive(Debug, Clone, Serialize)]
pub struct SyncConfig {
    /// How long an operation waits for the remote store (milliseconds)
    pub ready_timeout_ms: ConfigValue<u64>,
    /// How often `watch` re-reads a collection (milliseconds)
    pub snapshot_interval_ms: ConfigValue<u64>,
}

impl SyncConfig {
    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            ready_timeout: Duration::from_millis(self.ready_timeout_ms.value),
            snapshot_interval: Duration::from_millis(self.snapshot_interval_ms.value),
        }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the local mirror
    pub data_dir: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Hosted project settings
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    remote: Option<RemoteConfig>,
    sync: Option<SyncFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SyncFile {
    ready_timeout_ms: Option<u64>,
    snapshot_interval_ms: Option<u64>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let defaults = SyncOptions::default();

        // Start with defaults
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut ready_timeout_ms = ConfigValue::new(
            defaults.ready_timeout.as_millis() as u64,
            ConfigSource::Default,
        );
        let mut snapshot_interval_ms = ConfigValue::new(
            defaults.snapshot_interval.as_millis() as u64,
            ConfigSource::Default,
        );
        let mut config_file = None;
        let mut remote = RemoteConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(remote_config) = file_config.remote {
                remote = remote_config;
            }
            if let Some(sync) = file_config.sync {
                if let Some(ms) = sync.ready_timeout_ms {
                    ready_timeout_ms = ConfigValue::new(ms, ConfigSource::File);
                }
                if let Some(ms) = sync.snapshot_interval_ms {
                    snapshot_interval_ms = ConfigValue::new(ms, ConfigSource::File);
                }
            }
        }

        // Apply environment variable overrides
        if let Ok(dir) = std::env::var("EDUCONNECT_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(ms) = std::env::var("EDUCONNECT_READY_TIMEOUT_MS") {
            let ms = ms
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidEnv("EDUCONNECT_READY_TIMEOUT_MS", ms))?;
            ready_timeout_ms = ConfigValue::new(ms, ConfigSource::Environment);
        }
        // Remote env var overrides
        if let Ok(key) = std::env::var("EDUCONNECT_API_KEY") {
            remote.api_key = Some(key);
        }
        if let Ok(project) = std::env::var("EDUCONNECT_PROJECT_ID") {
            remote.project_id = Some(project);
        }
        if let Ok(bucket) = std::env::var("EDUCONNECT_STORAGE_BUCKET") {
            remote.storage_bucket = Some(bucket);
        }

        Ok(Self {
            data_dir,
            config_file,
            remote,
            sync: SyncConfig {
                ready_timeout_ms,
                snapshot_interval_ms,
            },
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/educonnect/
    /// - macOS: ~/Library/Application Support/educonnect/
    /// - Windows: %APPDATA%/educonnect/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("educonnect")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/educonnect/
    /// - macOS: ~/Library/Application Support/educonnect/
    /// - Windows: %APPDATA%/educonnect/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("educonnect")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEnv(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
