//! Core application logic for Podcast Fetcher
//!
//! This module contains the episode acquisition pipeline: the HTTP client,
//! data models, feed retrieval, metadata resolution, completeness checks, the
//! per-directory episode cache and the orchestration that ties them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use podcast_fetcher::app::{
//!     fetch_series_feed, ChannelUrl, Coordinator, CoordinatorConfig, NoopReporter,
//!     PodcastClient, ShutdownSignal,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let channel: ChannelUrl = "https://iono.fm/c/3443".parse()?;
//! let client = Arc::new(PodcastClient::new()?);
//! let config = CoordinatorConfig::default();
//! let shutdown = ShutdownSignal::new();
//!
//! let feed = fetch_series_feed(&client, &config.retry, &shutdown, &channel.feed_candidates()).await?;
//! let coordinator = Coordinator::new(config, client, shutdown, Arc::new(NoopReporter));
//!
//! let plan = coordinator.plan(&feed).await?;
//! let result = coordinator.download(&plan).await;
//! println!("{}", result.headline());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod coordinator;
pub mod dates;
pub mod feed;
pub mod hash;
pub mod models;
pub mod ordering;
pub mod progress;
pub mod resolver;
pub mod retry;
pub mod text;
pub mod verification;

// Re-export main public API
pub use cache::{CacheEntry, EpisodeCache};
pub use client::{ClientConfig, PodcastClient, RemoteProbe, TransferOutcome};
pub use coordinator::{
    Coordinator, CoordinatorConfig, RunOutcome, SeriesPlan, SessionResult, SessionStats,
    ShutdownSignal, SignalHandler,
};
pub use dates::{DateParser, DateParsing, FlexibleDateParser, StrictDateParser};
pub use feed::{fetch_series_feed, parse_feed, ChannelUrl};
pub use hash::{ContentDigests, Md5Hash};
pub use models::{
    AudioFormat, AudioQuality, Enclosure, Episode, Item, ResolutionSource, ResolvedMetadata,
    SeriesFeed,
};
pub use ordering::sort_episodes;
pub use progress::{LogReporter, NoopReporter, ProgressReporter};
pub use resolver::MetadataResolver;
pub use retry::RetryPolicy;
pub use verification::{CompletenessReport, CompletenessVerifier, DownloadState};
