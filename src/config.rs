//! Configuration management for Podcast Fetcher
//!
//! Settings come from, in increasing precedence: built-in defaults, a TOML
//! config file, environment variables (a `.env` file is honoured), and
//! command-line flags applied by the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::client::ClientConfig;
use crate::app::coordinator::CoordinatorConfig;
use crate::app::dates::DateParsing;
use crate::app::models::{AudioFormat, AudioQuality};
use crate::app::retry::RetryPolicy;
use crate::constants::{config as locations, env, files, http, limits, logging};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Where and how episodes are saved
    pub download: DownloadSettings,
    /// HTTP client settings
    pub client: ClientSettings,
    /// Retry policy for every network operation
    pub retry: RetryPolicy,
    /// Completeness policy
    pub verification: VerificationSettings,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// `[download]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Directory that holds the series directories
    pub output_root: PathBuf,
    /// Preferred audio rendition
    pub preferred_quality: AudioQuality,
    /// Container preference
    pub preferred_format: AudioFormat,
    /// Length limit for sanitized names
    pub filename_max_length: usize,
    /// Publication date parser
    pub date_parsing: DateParsing,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            preferred_quality: AudioQuality::default(),
            preferred_format: AudioFormat::default(),
            filename_max_length: files::FILENAME_MAX_LENGTH,
            date_parsing: DateParsing::default(),
        }
    }
}

/// `[client]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Timeout for page, feed and probe requests
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Timeout for HEAD probes
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
    /// Requests per second towards any host
    pub rate_limit_rps: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            probe_timeout: http::PROBE_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

/// `[verification]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VerificationSettings {
    /// Keep non-empty files whose completeness cannot be established
    pub trust_unverifiable: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
    /// Also write logs to `log_file`
    pub file_logging: bool,
    /// Log file path
    pub log_file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
            file_logging: false,
            log_file: PathBuf::from(logging::DEFAULT_LOG_FILE),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit, else the first one found)
    /// 3. Environment variables
    ///
    /// An explicit file must exist and parse. An implicitly found file that
    /// does not parse is reported and ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a missing or malformed explicit file, a bad
    /// environment override, or values that fail validation
    pub async fn load(config_file_override: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                Self::load_from_file(path).await?
            }
            None => match Self::find_config_file() {
                Some(path) => match Self::load_from_file(&path).await {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Ignoring config file {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                None => {
                    debug!("No config file found in standard locations");
                    Self::default()
                }
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unrecognized quality or format
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(env::QUALITY) {
            self.download.preferred_quality =
                value.parse().map_err(|reason| ConfigError::InvalidValue {
                    field: env::QUALITY.to_string(),
                    value: value.clone(),
                    reason,
                })?;
        }
        if let Some(value) = lookup(env::FORMAT) {
            self.download.preferred_format =
                value.parse().map_err(|reason| ConfigError::InvalidValue {
                    field: env::FORMAT.to_string(),
                    value: value.clone(),
                    reason,
                })?;
        }
        if let Some(value) = lookup(env::OUTPUT_ROOT).filter(|v| !v.trim().is_empty()) {
            self.download.output_root = PathBuf::from(value);
        }
        if let Some(value) = lookup(env::LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.logging.level = value.trim().to_ascii_lowercase();
        }
        Ok(())
    }

    /// Reject values the pipeline cannot work with
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |field: &str, value: String, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        };

        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "0".to_string(), "At least one attempt is required"));
        }
        if !(self.retry.backoff_multiplier >= 1.0) {
            return Err(invalid(
                "retry.backoff_multiplier",
                self.retry.backoff_multiplier.to_string(),
                "Must be at least 1.0",
            ));
        }
        if self.download.filename_max_length == 0 {
            return Err(invalid(
                "download.filename_max_length",
                "0".to_string(),
                "Must be greater than zero",
            ));
        }
        if self.client.rate_limit_rps == 0 {
            return Err(invalid("client.rate_limit_rps", "0".to_string(), "Must be greater than zero"));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(
                "logging.level",
                self.logging.level.clone(),
                "Expected one of error, warn, info, debug, trace",
            ));
        }
        Ok(())
    }

    /// Runtime HTTP client configuration
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: self.client.timeout,
            connect_timeout: self.client.connect_timeout,
            probe_timeout: self.client.probe_timeout,
            rate_limit_rps: self.client.rate_limit_rps,
            ..ClientConfig::default()
        }
    }

    /// Runtime coordinator configuration; per-run flags are left at defaults
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            output_root: self.download.output_root.clone(),
            quality: self.download.preferred_quality,
            format: self.download.preferred_format,
            filename_max_length: self.download.filename_max_length,
            trust_unverifiable: self.verification.trust_unverifiable,
            date_parsing: self.download.date_parsing,
            retry: self.retry.clone(),
            ..CoordinatorConfig::default()
        }
    }

    /// Serialize the effective configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Serialize` if TOML encoding fails
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write a commented default config file
    ///
    /// Uses the per-user location when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file exists (and `force` is unset) or
    /// cannot be written
    pub async fn write_default_file(path: Option<&Path>, force: bool) -> ConfigResult<PathBuf> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::get_default_config_path().ok_or_else(|| ConfigError::Io {
                path: PathBuf::from(locations::FILE_NAME),
                reason: "Could not determine user config directory".to_string(),
            })?,
        };

        if config_path.exists() && !force {
            return Err(ConfigError::Io {
                path: config_path,
                reason: "File already exists (use --force to overwrite)".to_string(),
            });
        }

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::Io {
                    path: parent.to_path_buf(),
                    reason: e.to_string(),
                })?;
        }

        tokio::fs::write(&config_path, Self::generate_default_config_content())
            .await
            .map_err(|e| ConfigError::Io {
                path: config_path.clone(),
                reason: e.to_string(),
            })?;

        info!("Wrote default configuration to {}", config_path.display());
        Ok(config_path)
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Option<PathBuf> {
        let mut search_paths: Vec<PathBuf> = locations::LOCAL_FILE_NAMES
            .iter()
            .map(PathBuf::from)
            .collect();
        search_paths.extend(Self::get_default_config_path());

        let found = search_paths.into_iter().find(|path| path.is_file());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Get the default config file path for the current user
    pub fn get_default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(locations::APP_DIR_NAME).join(locations::FILE_NAME))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# Podcast Fetcher Configuration
# Every key is optional; missing keys take the values shown here.

[download]
# Directory that holds one sub-directory per series
output_root = "."
# high, medium or low
preferred_quality = "medium"
# auto, mp3 or m4a
preferred_format = "auto"
# Length limit for directory and file names
filename_max_length = {filename_max_length}
# flexible (RFC 2822, RFC 3339, plain dates) or strict (RFC 2822 only)
date_parsing = "flexible"

[client]
timeout = "{timeout}"
connect_timeout = "{connect_timeout}"
probe_timeout = "{probe_timeout}"
rate_limit_rps = {rate_limit_rps}

[retry]
max_attempts = {max_attempts}
initial_delay = "{initial_delay}"
backoff_multiplier = {backoff_multiplier:.1}
max_delay = "{max_delay}"

[verification]
# Keep existing files that can be neither confirmed nor refuted
trust_unverifiable = false

[logging]
level = "{level}"  # error, warn, info, debug, trace
file_logging = false
log_file = "{log_file}"
"#,
            filename_max_length = files::FILENAME_MAX_LENGTH,
            timeout = secs(http::DEFAULT_TIMEOUT),
            connect_timeout = secs(http::CONNECT_TIMEOUT),
            probe_timeout = secs(http::PROBE_TIMEOUT),
            rate_limit_rps = limits::DEFAULT_RATE_LIMIT_RPS,
            max_attempts = limits::MAX_ATTEMPTS,
            initial_delay = secs(limits::RETRY_INITIAL_DELAY),
            backoff_multiplier = limits::RETRY_BACKOFF_MULTIPLIER,
            max_delay = secs(limits::RETRY_MAX_DELAY),
            level = logging::DEFAULT_LOG_LEVEL,
            log_file = logging::DEFAULT_LOG_FILE,
        )
    }
}

fn secs(duration: Duration) -> String {
    format!("{}s", duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_creation() {
        let config = AppConfig::default();

        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.download.preferred_quality, AudioQuality::Medium);
        assert_eq!(config.logging.level, "info");
        assert!(!config.verification.trust_unverifiable);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_generation() {
        let content = AppConfig::generate_default_config_content();

        // Should be valid TOML matching the defaults
        let parsed: AppConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, AppConfig::default());
        assert!(content.contains("# Podcast Fetcher Configuration"));
        assert!(content.contains("[verification]"));
    }

    #[tokio::test]
    async fn test_config_loading_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let result = AppConfig::load(Some(&config_path)).await;
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_config_loading_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let test_config = r#"
[download]
preferred_quality = "high"
filename_max_length = 40

[retry]
max_attempts = 5
initial_delay = "250ms"
backoff_multiplier = 1.5
max_delay = "1m"

[logging]
level = "debug"
"#;
        tokio::fs::write(&config_path, test_config).await.unwrap();

        let config = AppConfig::load(Some(&config_path)).await.unwrap();
        assert_eq!(config.download.preferred_quality, AudioQuality::High);
        assert_eq!(config.download.filename_max_length, 40);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_delay, Duration::from_secs(60));

        // Unspecified values keep their defaults
        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.download.preferred_format, AudioFormat::Auto);
    }

    #[tokio::test]
    async fn test_explicit_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        tokio::fs::write(&config_path, "[download\nnope").await.unwrap();

        let result = AppConfig::load(Some(&config_path)).await;
        assert!(matches!(result, Err(ConfigError::InvalidFormat(_))));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (env::QUALITY, "LOW"),
            (env::FORMAT, "mp3"),
            (env::OUTPUT_ROOT, "/srv/podcasts"),
            (env::LOG_LEVEL, "Debug"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.download.preferred_quality, AudioQuality::Low);
        assert_eq!(config.download.preferred_format, AudioFormat::Mp3);
        assert_eq!(config.download.output_root, PathBuf::from("/srv/podcasts"));
        assert_eq!(config.logging.level, "debug");

        let result = config.apply_overrides(|key| (key == env::QUALITY).then(|| "ultra".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retry.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.download.filename_max_length = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.client.rate_limit_rps = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_runtime_conversion() {
        let mut config = AppConfig::default();
        config.client.timeout = Duration::from_secs(5);
        config.verification.trust_unverifiable = true;

        let client = config.client_config();
        assert_eq!(client.request_timeout, Duration::from_secs(5));
        assert!(client.tcp_nodelay);

        let coordinator = config.coordinator_config();
        assert!(coordinator.trust_unverifiable);
        assert!(!coordinator.recheck);
        assert_eq!(coordinator.retry, config.retry);
    }

    #[tokio::test]
    async fn test_write_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let written = AppConfig::write_default_file(Some(&path), false).await.unwrap();
        assert_eq!(written, path);
        assert!(AppConfig::write_default_file(Some(&path), false).await.is_err());
        assert!(AppConfig::write_default_file(Some(&path), true).await.is_ok());

        let loaded = AppConfig::load(Some(&path)).await.unwrap();
        assert_eq!(loaded.retry, RetryPolicy::default());
    }

    #[test]
    fn test_show_round_trip() {
        let text = AppConfig::default().to_toml_string().unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }
}
