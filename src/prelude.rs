//! Prelude module for Podcast Fetcher Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use podcast_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use podcast_fetcher::prelude::*;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<()> {
//!     let client = Arc::new(PodcastClient::new()?);
//!     let coordinator = Coordinator::new(
//!         CoordinatorConfig::default(),
//!         client,
//!         ShutdownSignal::new(),
//!         Arc::new(LogReporter::default()),
//!     );
//!     // Continue with plan / download...
//!     # let _ = coordinator;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    // Data types
    AudioFormat,
    AudioQuality,
    ChannelUrl,
    ClientConfig,
    // Core orchestration
    Coordinator,
    CoordinatorConfig,
    Episode,
    EpisodeCache,
    Item,
    LogReporter,
    NoopReporter,
    PodcastClient,
    ProgressReporter,
    RetryPolicy,
    // Result and status types
    RunOutcome,
    SeriesFeed,
    SeriesPlan,
    SessionResult,
    ShutdownSignal,

    // Feed functions
    fetch_series_feed,
    parse_feed,
};

// Configuration
pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{CACHE_FILE_NAME, DEFAULT_RATE_LIMIT_RPS, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

// Common external crate re-exports for convenience
pub use tokio;
