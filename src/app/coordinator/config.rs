//! Configuration structures for the download coordinator
//!
//! This module defines the options that shape one run: where files go, how
//! they are named, which audio rendition is preferred and how completeness is
//! judged.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::app::dates::DateParsing;
use crate::app::models::{AudioFormat, AudioQuality};
use crate::app::retry::RetryPolicy;
use crate::constants::files;

/// Configuration for the download coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Directory that holds the series directories
    pub output_root: PathBuf,
    /// Explicit series directory name (else the author, else the feed title)
    pub series_dir: Option<String>,
    /// Preferred audio rendition
    pub quality: AudioQuality,
    /// Container preference
    pub format: AudioFormat,
    /// Length limit for sanitized names
    pub filename_max_length: usize,
    /// Name files after the display title instead of the description
    pub short_names: bool,
    /// Ignore cached metadata and push verified files through the downloader
    pub recheck: bool,
    /// Keep non-empty files that cannot be verified
    pub trust_unverifiable: bool,
    /// Publication date parser
    pub date_parsing: DateParsing,
    /// Retry policy shared by every network operation
    pub retry: RetryPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            series_dir: None,
            quality: AudioQuality::default(),
            format: AudioFormat::default(),
            filename_max_length: files::FILENAME_MAX_LENGTH,
            short_names: false,
            recheck: false,
            trust_unverifiable: false,
            date_parsing: DateParsing::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Set the output root
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Force the series directory name
    pub fn with_series_dir(mut self, name: impl Into<String>) -> Self {
        self.series_dir = Some(name.into());
        self
    }

    /// Set the preferred quality
    pub fn with_quality(mut self, quality: AudioQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Enable or disable short file names
    pub fn with_short_names(mut self, enabled: bool) -> Self {
        self.short_names = enabled;
        self
    }

    /// Enable or disable recheck mode
    pub fn with_recheck(mut self, enabled: bool) -> Self {
        self.recheck = enabled;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builder() {
        let retry = RetryPolicy {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            ..Default::default()
        };
        let config = CoordinatorConfig::default()
            .with_output_root("/tmp/out")
            .with_series_dir("My Show")
            .with_quality(AudioQuality::High)
            .with_short_names(true)
            .with_recheck(true)
            .with_retry(retry.clone());

        assert_eq!(config.output_root, PathBuf::from("/tmp/out"));
        assert_eq!(config.series_dir.as_deref(), Some("My Show"));
        assert_eq!(config.quality, AudioQuality::High);
        assert!(config.short_names);
        assert!(config.recheck);
        assert_eq!(config.retry, retry);
        assert_eq!(config.filename_max_length, 80);
    }
}
