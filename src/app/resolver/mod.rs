//! Metadata resolution for feed items
//!
//! The feed and the episode landing page disagree often enough that neither
//! can be trusted alone. The resolver fetches the landing page (under the retry
//! policy), runs the audio discovery strategies, and merges page metadata over
//! feed metadata. When the page cannot be fetched at all the item still
//! resolves, from feed data only.
//!
//! - [`page`] - HTML extraction
//! - [`strategies`] - Ordered audio URL discovery

pub mod page;
pub mod strategies;

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::app::client::PodcastClient;
use crate::app::coordinator::signals::ShutdownSignal;
use crate::app::models::{AudioQuality, Item, ResolutionSource, ResolvedMetadata};
use crate::app::retry::RetryPolicy;
use crate::app::text::extract_episode_number;
use crate::errors::{DownloadError, DownloadResult};

pub use page::LandingPage;
pub use strategies::{AudioSearch, Strategy, STRATEGIES};

/// Resolves each feed item into authoritative metadata
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    client: Arc<PodcastClient>,
    retry: RetryPolicy,
    shutdown: ShutdownSignal,
    quality: AudioQuality,
}

impl MetadataResolver {
    /// Create a resolver
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client
    /// * `retry` - Policy applied to landing page fetches
    /// * `shutdown` - Cancels retries in progress
    /// * `quality` - Preferred audio quality
    pub fn new(
        client: Arc<PodcastClient>,
        retry: RetryPolicy,
        shutdown: ShutdownSignal,
        quality: AudioQuality,
    ) -> Self {
        Self {
            client,
            retry,
            shutdown,
            quality,
        }
    }

    /// Resolve one item
    ///
    /// A landing page that cannot be fetched after retries is not an error:
    /// the result is built from the feed and marked
    /// [`ResolutionSource::FeedFallback`].
    ///
    /// # Errors
    ///
    /// Only `DownloadError::Cancelled`, when shutdown interrupts the fetch.
    pub async fn resolve(&self, item: &Item) -> DownloadResult<ResolvedMetadata> {
        let body = match self
            .retry
            .execute("landing page", &self.shutdown, || {
                self.client.get_page(&item.landing_url)
            })
            .await
        {
            Ok(body) => body,
            Err(e) if e.is_cancelled() => return Err(DownloadError::Cancelled),
            Err(e) => {
                warn!("Failed to fetch {}: {}", item.landing_url, e);
                info!("Falling back to RSS enclosure.");
                let fallback = ResolvedMetadata::from_feed(item);
                if fallback.audio_url.is_none() {
                    error!("Failed to find audio URL for {}", item.landing_url);
                }
                return Ok(fallback);
            }
        };

        let page = LandingPage::parse(&body);
        Ok(self.resolve_from_page(item, &page))
    }

    /// Merge a fetched landing page with the feed item
    pub fn resolve_from_page(&self, item: &Item, page: &LandingPage) -> ResolvedMetadata {
        let audio_url = find_audio_url(item, page, self.quality);
        if audio_url.is_none() {
            error!("Failed to find audio URL for {}", item.landing_url);
        }

        let page_title = page.page_title();
        let episode_number = match page_title.and_then(extract_episode_number) {
            Some(page_number) => {
                if let Some(feed_number) = item.feed_episode_number {
                    if feed_number != page_number {
                        debug!(
                            "HTML episode number ({}) differs from RSS ({}). Using HTML.",
                            page_number, feed_number
                        );
                    }
                }
                Some(page_number)
            }
            None => {
                debug!(
                    "Could not extract episode number from HTML title: '{}'",
                    page_title.unwrap_or_default()
                );
                item.feed_episode_number
            }
        };

        if let Some(title) = page_title {
            if title != item.title {
                debug!("HTML title ('{}') differs from RSS title ('{}')", title, item.title);
            }
        }

        let display_title = page_title.unwrap_or(&item.title).to_string();
        let description = page
            .description
            .clone()
            .unwrap_or_else(|| display_title.clone());

        debug!(
            "Extracted author: {}",
            page.author.as_deref().unwrap_or("None (will use podcast name)")
        );

        ResolvedMetadata {
            audio_url,
            episode_number,
            description,
            display_title,
            author: page.author.clone(),
            source: ResolutionSource::LandingPage,
        }
    }
}

/// Run the strategies in order and pick one URL from the first that yields any
///
/// Falls back to the primary feed enclosure when every strategy is empty.
pub fn find_audio_url(item: &Item, page: &LandingPage, quality: AudioQuality) -> Option<String> {
    let search = AudioSearch { item, page };

    for (name, strategy) in STRATEGIES {
        let candidates = strategy(&search);
        if let Some(chosen) = strategies::select_by_quality(&candidates, quality) {
            debug!(
                "Strategy {} selected {} ({} candidates)",
                name,
                chosen,
                candidates.len()
            );
            return Some(strategies::absolutize(chosen, &item.landing_url));
        }
        debug!("Strategy {} found nothing", name);
    }

    item.primary_enclosure().map(|e| {
        info!("Using RSS enclosure URL: {}", e.url);
        e.url.clone()
    })
}
