//! Podcast Fetcher Library
//!
//! A Rust library for archiving iono.fm podcast series. Episodes are found
//! through the series RSS feed, confirmed against their landing pages, and
//! written to disk with resumable transfers that skip files already verified
//! complete.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(DEFAULT_RATE_LIMIT_RPS, 5);
        assert_eq!(CACHE_FILE_NAME, "cache.json");
        assert!(USER_AGENT.contains("Podcast-Fetcher"));
    }

    #[test]
    fn test_error_types() {
        let feed_error = errors::FeedError::NoSeriesTitle {
            tried: "a, b".to_string(),
        };
        let app_error = AppError::Feed(feed_error);

        assert_eq!(app_error.category(), "feed");
        assert!(!app_error.is_recoverable());
    }
}
