//! Error types for Podcast Fetcher
//!
//! This module defines the error types for all components of the application.
//! Errors are grouped by concern so callers can tell a transient network hiccup
//! (retry it) from a permanent failure (skip the item) from a user interrupt
//! (stop cleanly).

use std::path::PathBuf;
use thiserror::Error;

/// Network transfer and HTTP errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error during file operations
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned a 5xx status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server returned a client error status that retrying will not fix
    #[error("Request rejected: HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// All retry attempts consumed; carries the last error
    #[error("Gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<DownloadError>,
    },

    /// No response or body data arrived within the configured timeout
    #[error("Timed out after {timeout:?} waiting for {url}")]
    Timeout {
        url: String,
        timeout: std::time::Duration,
    },

    /// Client could not be built from the given settings
    #[error("Invalid client configuration: {reason}")]
    InvalidConfig { reason: String },

    /// User interrupt observed mid-operation
    #[error("Operation cancelled by user")]
    Cancelled,
}

impl DownloadError {
    /// Whether retrying the same operation could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            DownloadError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.is_body()
                    || e.status().is_some_and(|s| s.is_server_error() || s == 429)
            }
            DownloadError::Io(_)
            | DownloadError::ServerError { .. }
            | DownloadError::Timeout { .. }
            | DownloadError::RateLimitExceeded => true,
            DownloadError::InvalidUrl { .. }
            | DownloadError::HttpStatus { .. }
            | DownloadError::InvalidConfig { .. }
            | DownloadError::RetriesExhausted { .. }
            | DownloadError::Cancelled => false,
        }
    }

    /// Whether this error (or the error it wraps) is a user interrupt
    pub fn is_cancelled(&self) -> bool {
        match self {
            DownloadError::Cancelled => true,
            DownloadError::RetriesExhausted { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Map a non-success HTTP status to the matching error variant
    pub fn from_status(status: reqwest::StatusCode, url: &str) -> Self {
        match status.as_u16() {
            429 => DownloadError::RateLimitExceeded,
            s if status.is_server_error() => DownloadError::ServerError { status: s },
            s => DownloadError::HttpStatus {
                status: s,
                url: url.to_string(),
            },
        }
    }
}

/// Feed retrieval and parsing errors
#[derive(Error, Debug)]
pub enum FeedError {
    /// Channel URL is not of the form https://iono.fm/c/<number>
    #[error("Channel URL must be in the format https://iono.fm/c/<number>, got: {url}")]
    InvalidChannelUrl { url: String },

    /// Feed body could not be parsed as RSS
    #[error("RSS parse error: {0}")]
    Parse(#[from] rss::Error),

    /// Network failure fetching the feed
    #[error("Feed request failed: {0}")]
    Download(#[from] DownloadError),

    /// None of the candidate feeds carried a series title
    #[error("Could not retrieve podcast name from RSS feeds ({tried}). Check the channel URL")]
    NoSeriesTitle { tried: String },
}

/// Episode cache and output directory errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Output directory could not be created or accessed
    #[error("Download directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// Cache document could not be serialized
    #[error("Cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Cache document could not be written or swapped into place
    #[error("Atomic cache write failed: could not replace {path}: {reason}")]
    AtomicWriteFailed { path: PathBuf, reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Configuration could not be rendered back to TOML
    #[error("Configuration serialization failed: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// I/O error reading or writing a config file
    #[error("Config file I/O error for {path}: {reason}")]
    Io { path: PathBuf, reason: String },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Feed error
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Download(e) => e.is_transient(),
            AppError::Feed(FeedError::Download(e)) => e.is_transient(),
            _ => false,
        }
    }

    /// Whether the run stopped because the user interrupted it
    pub fn is_cancellation(&self) -> bool {
        match self {
            AppError::Download(e) | AppError::Feed(FeedError::Download(e)) => e.is_cancelled(),
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Download(_) => "download",
            AppError::Feed(_) => "feed",
            AppError::Cache(_) => "cache",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Feed result type alias
pub type FeedResult<T> = std::result::Result<T, FeedError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Config result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
