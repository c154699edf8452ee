//! Episode acquisition orchestration
//!
//! A run has two phases, split so the caller can ask for confirmation in
//! between:
//!
//! 1. [`Coordinator::plan`] picks the series directory, resolves every feed
//!    item (through the episode cache when possible) and orders the result.
//! 2. [`Coordinator::download`] walks the plan one episode at a time:
//!    probe, verify, then transfer when the local copy is not complete.
//!
//! The coordinator module is organized into specialized components:
//!
//! - [`config`] - Run options
//! - [`naming`] - Directory and file names
//! - [`signals`] - Signal handling for graceful shutdown
//! - [`stats`] - Counters and session results

pub mod config;
pub mod naming;
pub mod signals;
pub mod stats;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::app::cache::{CacheEntry, EpisodeCache};
use crate::app::client::{PodcastClient, TransferOutcome};
use crate::app::dates::DateParser;
use crate::app::models::{file_extension, Episode, Item, ResolutionSource, ResolvedMetadata, SeriesFeed};
use crate::app::ordering::sort_episodes;
use crate::app::progress::ProgressReporter;
use crate::app::resolver::MetadataResolver;
use crate::app::verification::{find_existing, CompletenessVerifier, DownloadState};
use crate::errors::{AppError, CacheError, DownloadResult, Result};

pub use config::CoordinatorConfig;
pub use naming::{episode_file_stem, series_dir_name};
pub use signals::{ShutdownSignal, SignalHandler};
pub use stats::{ItemOutcome, RunOutcome, SessionResult, SessionStats};

/// Ordered, resolved episodes for one series
#[derive(Debug, Clone)]
pub struct SeriesPlan {
    /// Series title from the feed
    pub series_title: String,
    /// Sanitized directory name
    pub dir_name: String,
    /// Full path of the series directory
    pub series_dir: PathBuf,
    /// Episodes in download order
    pub episodes: Vec<Episode>,
    /// Feed items without a resolvable audio URL
    pub unresolved: usize,
    /// Items resolved from the feed alone
    pub feed_fallbacks: usize,
    /// Items served from the episode cache
    pub cached: usize,
    /// `Interrupted` when shutdown stopped resolution early
    pub outcome: RunOutcome,
}

/// Drives the pipeline for one series
pub struct Coordinator {
    config: CoordinatorConfig,
    client: Arc<PodcastClient>,
    resolver: MetadataResolver,
    verifier: CompletenessVerifier,
    shutdown: ShutdownSignal,
    reporter: Arc<dyn ProgressReporter>,
    date_parser: Box<dyn DateParser>,
}

impl Coordinator {
    /// Create a coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - Run options
    /// * `client` - Shared HTTP client
    /// * `shutdown` - Observed between items, in retries and during transfers
    /// * `reporter` - Receives transfer progress
    pub fn new(
        config: CoordinatorConfig,
        client: Arc<PodcastClient>,
        shutdown: ShutdownSignal,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        let resolver = MetadataResolver::new(
            client.clone(),
            config.retry.clone(),
            shutdown.clone(),
            config.quality,
        );
        let verifier = CompletenessVerifier::new(
            client.clone(),
            config.retry.clone(),
            shutdown.clone(),
            config.trust_unverifiable,
        );
        let date_parser = config.date_parsing.parser();

        Self {
            config,
            client,
            resolver,
            verifier,
            shutdown,
            reporter,
            date_parser,
        }
    }

    /// Run options
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Resolve and order every item of `feed`
    ///
    /// Creates the series directory and writes resolved metadata through to
    /// its episode cache. Items resolved from the feed alone are not cached,
    /// so a later run tries their landing pages again.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::DirectoryNotAccessible` when the series directory
    /// cannot be created, or `DownloadError::Cancelled` when shutdown arrives
    /// before the directory is known.
    pub async fn plan(&self, feed: &SeriesFeed) -> Result<SeriesPlan> {
        info!("Found {} episodes for {}", feed.items.len(), feed.title);

        // The author lives on the landing pages, so the first item is resolved
        // up front unless the directory was named explicitly
        let first = match (&self.config.series_dir, feed.items.first()) {
            (None, Some(item)) => Some(self.resolver.resolve(item).await?),
            _ => None,
        };
        let author = first.as_ref().and_then(|meta| meta.author.as_deref());

        let dir_name = series_dir_name(
            self.config.series_dir.as_deref(),
            author,
            &feed.title,
            self.config.filename_max_length,
        );
        let series_dir = self.config.output_root.join(&dir_name);
        tokio::fs::create_dir_all(&series_dir).await.map_err(|e| {
            error!("Cannot create {}: {}", series_dir.display(), e);
            AppError::Cache(CacheError::DirectoryNotAccessible {
                path: series_dir.clone(),
            })
        })?;

        let cache = EpisodeCache::load(&series_dir).await;
        let mut first = first;
        let mut plan = SeriesPlan {
            series_title: feed.title.clone(),
            dir_name,
            series_dir,
            episodes: Vec::with_capacity(feed.items.len()),
            unresolved: 0,
            feed_fallbacks: 0,
            cached: 0,
            outcome: RunOutcome::Completed,
        };

        for item in &feed.items {
            if self.shutdown.is_triggered() {
                plan.outcome = RunOutcome::Interrupted;
                break;
            }
            let precomputed = first.take();

            let meta = match self.cached_metadata(&cache, item).await {
                Some(meta) => {
                    plan.cached += 1;
                    meta
                }
                None => {
                    info!("Processing: {}", item.title);
                    if let Some(published) = &item.published {
                        debug!("Published: {}", published);
                    }
                    let resolved = match precomputed {
                        Some(meta) => meta,
                        None => match self.resolver.resolve(item).await {
                            Ok(meta) => meta,
                            Err(e) if e.is_cancelled() => {
                                plan.outcome = RunOutcome::Interrupted;
                                break;
                            }
                            Err(e) => {
                                error!("Failed to resolve {}: {}", item.landing_url, e);
                                plan.unresolved += 1;
                                continue;
                            }
                        },
                    };
                    if resolved.source == ResolutionSource::FeedFallback {
                        plan.feed_fallbacks += 1;
                    } else if resolved.audio_url.is_some() {
                        if let Err(e) = cache
                            .put(&item.landing_url, &CacheEntry::new(item, &resolved))
                            .await
                        {
                            warn!("Could not save cache: {}", e);
                        }
                    }
                    resolved
                }
            };

            match episode_from(item, meta) {
                Some(episode) => plan.episodes.push(episode),
                None => {
                    error!("Skipping episode (no audio URL): {}", item.title);
                    plan.unresolved += 1;
                }
            }
        }

        sort_episodes(&mut plan.episodes, self.date_parser.as_ref());
        info!("Sorted {} episodes", plan.episodes.len());
        Ok(plan)
    }

    /// Download every episode of `plan`, in order
    ///
    /// Per-episode failures are logged and counted; the run moves on. Shutdown
    /// stops the run after the current chunk and leaves partial files behind
    /// for a later resume.
    pub async fn download(&self, plan: &SeriesPlan) -> SessionResult {
        let started = Instant::now();
        let mut stats = SessionStats {
            total: plan.episodes.len(),
            unresolved: plan.unresolved,
            feed_fallbacks: plan.feed_fallbacks,
            cached: plan.cached,
            ..Default::default()
        };
        let mut outcome = plan.outcome;
        let mut completed = Vec::new();

        if outcome == RunOutcome::Completed {
            for episode in &plan.episodes {
                if self.shutdown.is_triggered() {
                    outcome = RunOutcome::Interrupted;
                    break;
                }

                match self.process_episode(episode, &plan.series_dir).await {
                    Ok(result) => {
                        stats.record(result);
                        completed.push(episode.id.clone());
                    }
                    Err(e) if e.is_cancelled() => {
                        outcome = RunOutcome::Interrupted;
                        break;
                    }
                    Err(e) => {
                        error!("Failed to download {}: {}", episode.title, e);
                        stats.record_failure();
                    }
                }
            }
        }

        let result = SessionResult {
            stats,
            outcome,
            series_dir: plan.series_dir.clone(),
            completed,
            total_duration: started.elapsed(),
        };
        info!("{}", result.headline());
        result
    }

    /// Probe, verify and (when needed) transfer one episode
    ///
    /// # Errors
    ///
    /// Returns the transfer error after retries, or `DownloadError::Cancelled`
    pub async fn process_episode(
        &self,
        episode: &Episode,
        series_dir: &Path,
    ) -> DownloadResult<ItemOutcome> {
        let url = episode.audio_url.as_str();

        // One probe serves both extension detection and verification
        let probe = self.verifier.probe_or_log(url).await?;
        let extension = file_extension(
            url,
            probe.as_ref().and_then(|p| p.content_type.as_deref()),
            self.config.format,
        );
        let stem = episode_file_stem(
            episode,
            self.config.short_names,
            self.config.filename_max_length,
        );
        let target = series_dir.join(format!("{}.{}", stem, extension));

        let local = find_existing(&target).await?;
        let report = self
            .verifier
            .assess(local.as_ref(), probe.as_ref(), episode.enclosure_length)
            .await;
        info!("{}", report.message);

        if report.is_complete && !self.config.recheck {
            return Ok(ItemOutcome::Skipped);
        }

        let destination = report.existing_path.clone().unwrap_or(target);
        if report.state == DownloadState::Incomplete {
            let expected = probe
                .as_ref()
                .and_then(|p| p.content_length)
                .filter(|len| *len > 0)
                .or(episode.enclosure_length);
            // A file longer than the remote one cannot be a prefix of it; an
            // equal-length file is left to the ranged request
            if expected.is_some_and(|len| report.local_size > len) {
                warn!(
                    "Discarding {} ({} bytes): does not match the remote file",
                    destination.display(),
                    report.local_size
                );
                tokio::fs::remove_file(&destination).await?;
            }
        }

        let name = file_name(&destination);
        let transfer = self
            .config
            .retry
            .execute("download", &self.shutdown, || {
                self.client.download_resumable(
                    url,
                    &destination,
                    self.reporter.as_ref(),
                    &self.shutdown,
                )
            })
            .await?;

        Ok(match transfer {
            TransferOutcome::AlreadyComplete => {
                info!("File already complete: {}", name);
                ItemOutcome::AlreadyComplete
            }
            TransferOutcome::Completed {
                bytes_written,
                resumed_from,
            } => {
                info!("Saved: {}", name);
                ItemOutcome::Downloaded {
                    bytes_written,
                    resumed_from,
                }
            }
        })
    }

    async fn cached_metadata(&self, cache: &EpisodeCache, item: &Item) -> Option<ResolvedMetadata> {
        if self.config.recheck {
            return None;
        }
        let entry = cache.get(&item.landing_url).await?;
        debug!("Using cached episode data: {}", item.title);
        Some(entry.to_metadata())
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn episode_from(item: &Item, meta: ResolvedMetadata) -> Option<Episode> {
    Some(Episode {
        id: item.id.clone(),
        landing_url: item.landing_url.clone(),
        title: item.title.clone(),
        audio_url: meta.audio_url?,
        episode_number: meta.episode_number,
        description: meta.description,
        display_title: meta.display_title,
        published: item.published.clone(),
        enclosure_length: item.enclosure_length(),
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
