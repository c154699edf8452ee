//! Application constants for Podcast Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for configuration overrides
pub mod env {
    /// Overrides `download.preferred_quality`
    pub const QUALITY: &str = "PODCAST_FETCHER_QUALITY";

    /// Overrides `download.preferred_format`
    pub const FORMAT: &str = "PODCAST_FETCHER_FORMAT";

    /// Overrides `download.output_root`
    pub const OUTPUT_ROOT: &str = "PODCAST_FETCHER_OUTPUT_ROOT";

    /// Overrides `logging.level`
    pub const LOG_LEVEL: &str = "PODCAST_FETCHER_LOG_LEVEL";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Podcast-Fetcher/0.1.0 (Episode Archiver)";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Timeout for HEAD probes used by completeness checks
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;
}

/// Rate limiting and retry configuration
pub mod limits {
    use super::Duration;

    /// Default request rate towards iono.fm (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 5;

    /// Maximum attempts per network operation (including the first)
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Delay before the first retry
    pub const RETRY_INITIAL_DELAY: Duration = Duration::from_secs(1);

    /// Multiplier applied to the delay after each retry
    pub const RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;

    /// Ceiling on a single backoff sleep
    pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);
}

/// iono.fm service URLs and patterns
pub mod iono {
    /// Prefix every channel URL must start with
    pub const CHANNEL_URL_PREFIX: &str = "https://iono.fm/c/";

    /// Channel feed, tried first
    pub const CHANNEL_FEED_BASE: &str = "https://iono.fm/rss/chan/";

    /// Provider feed, tried when the channel feed has no title
    pub const PROVIDER_FEED_BASE: &str = "https://iono.fm/rss/prov/";

    /// Marker of the serialized page state script
    pub const PAGE_STATE_MARKER: &str = "STATE_FROM_SERVER";

    /// Host that serves episode audio
    pub const AUDIO_HOST: &str = "dl.iono.fm";

    /// Episode audio URL with a recognized quality suffix
    pub const QUALITY_AUDIO_PATTERN: &str =
        r"https://dl\.iono\.fm/epi/prov_\d+/epi_\d+_(?:high|medium|low)\.m4a";

    /// Episode audio URL with any suffix
    pub const ANY_AUDIO_PATTERN: &str = r"https://dl\.iono\.fm/epi/prov_\d+/epi_\d+_\w+\.m4a";
}

/// Landing page CSS selectors
pub mod selectors {
    /// Open Graph title
    pub const OG_TITLE: &str = r#"meta[property="og:title"]"#;

    /// Open Graph audio reference
    pub const OG_AUDIO: &str = r#"meta[property="og:audio"]"#;

    /// Page description
    pub const DESCRIPTION: &str = r#"meta[name="description"]"#;

    /// Page author
    pub const AUTHOR: &str = r#"meta[name="author"]"#;

    /// Document title
    pub const TITLE: &str = "title";

    /// Inline audio control
    pub const AUDIO: &str = "audio";

    /// Source children of an audio control
    pub const AUDIO_SOURCE: &str = "audio source";

    /// Inline scripts
    pub const SCRIPT: &str = "script";
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Episode cache document name inside each series directory
    pub const CACHE_FILE_NAME: &str = "cache.json";

    /// Extensions a downloaded episode may carry, in lookup order
    pub const AUDIO_EXTENSIONS: [&str; 2] = ["mp3", "m4a"];

    /// Extension used when nothing else identifies the container
    pub const DEFAULT_AUDIO_EXTENSION: &str = "m4a";

    /// Write buffer and hashing chunk size (8KB)
    pub const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

    /// Default filename length limit
    pub const FILENAME_MAX_LENGTH: usize = 80;

    /// Name used when sanitization leaves nothing behind
    pub const UNNAMED: &str = "unnamed";
}

/// Configuration file locations
pub mod config {
    /// Project-local config files, searched in order
    pub const LOCAL_FILE_NAMES: [&str; 2] = ["podcast_config.toml", "podcast-fetcher.toml"];

    /// Application directory under the user config directory
    pub const APP_DIR_NAME: &str = "podcast-fetcher";

    /// File name inside the application directory
    pub const FILE_NAME: &str = "config.toml";
}

/// Progress reporting
pub mod progress {
    /// Bytes between log lines for the non-interactive reporter (1MB)
    pub const LOG_INTERVAL_BYTES: u64 = 1024 * 1024;
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// Default log file name
    pub const DEFAULT_LOG_FILE: &str = "podcast_download.log";
}

/// Episode-number extraction bounds
pub mod episodes {
    /// Smallest accepted episode number
    pub const MIN_EPISODE_NUMBER: u32 = 1;

    /// Largest accepted episode number
    pub const MAX_EPISODE_NUMBER: u32 = 9999;
}

// Re-export commonly used constants for convenience
pub use files::{CACHE_FILE_NAME, TEMP_FILE_SUFFIX};
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{DEFAULT_RATE_LIMIT_RPS, MAX_ATTEMPTS};
