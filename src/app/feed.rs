//! Series feed retrieval
//!
//! A channel URL (`https://iono.fm/c/<id>`) maps to two candidate RSS feeds:
//! the channel feed and the provider feed. The first one that parses and
//! carries a non-empty channel title supplies the series.

use std::fmt;
use std::str::FromStr;

use rss::extension::Extension;
use rss::Channel;
use tracing::{debug, info, warn};

use crate::app::client::PodcastClient;
use crate::app::coordinator::signals::ShutdownSignal;
use crate::app::models::{episode_id_from_link, Enclosure, Item, SeriesFeed};
use crate::app::retry::RetryPolicy;
use crate::app::text::extract_episode_number;
use crate::constants::{episodes, iono};
use crate::errors::{DownloadError, FeedError, FeedResult};

/// A validated iono.fm channel URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUrl {
    id: String,
}

impl ChannelUrl {
    /// Numeric channel identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Feed URLs to try, in order
    pub fn feed_candidates(&self) -> Vec<String> {
        vec![
            format!("{}{}", iono::CHANNEL_FEED_BASE, self.id),
            format!("{}{}", iono::PROVIDER_FEED_BASE, self.id),
        ]
    }
}

impl FromStr for ChannelUrl {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FeedError::InvalidChannelUrl { url: s.to_string() };

        let id = s
            .trim()
            .strip_prefix(iono::CHANNEL_URL_PREFIX)
            .map(|rest| rest.trim_end_matches('/'))
            .ok_or_else(invalid)?;

        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        Ok(Self { id: id.to_string() })
    }
}

impl fmt::Display for ChannelUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", iono::CHANNEL_URL_PREFIX, self.id)
    }
}

/// Fetch the first candidate feed that names its series
///
/// Each candidate is fetched under its own retry budget. A candidate that
/// fails to download, fails to parse or has an empty title is logged and the
/// next one is tried.
///
/// # Errors
///
/// Returns `FeedError::NoSeriesTitle` when no candidate works, or
/// `FeedError::Download(DownloadError::Cancelled)` on shutdown.
pub async fn fetch_series_feed(
    client: &PodcastClient,
    retry: &RetryPolicy,
    shutdown: &ShutdownSignal,
    candidates: &[String],
) -> FeedResult<SeriesFeed> {
    for url in candidates {
        info!("Fetching RSS feed from {}...", url);

        let body = match retry
            .execute("feed fetch", shutdown, || client.get_page(url))
            .await
        {
            Ok(body) => body,
            Err(e) if e.is_cancelled() => return Err(DownloadError::Cancelled.into()),
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                continue;
            }
        };

        match parse_feed(&body, url) {
            Ok(feed) if !feed.title.is_empty() => {
                info!("Podcast/Series: {}", feed.title);
                return Ok(feed);
            }
            Ok(_) => warn!("No podcast name found in {}. Trying next feed...", url),
            Err(e) => warn!("Failed to parse {}: {}", url, e),
        }
    }

    Err(FeedError::NoSeriesTitle {
        tried: candidates.join(", "),
    })
}

/// Parse an RSS document into a series
///
/// Items without a usable landing page link are dropped with a warning.
///
/// # Errors
///
/// Returns `FeedError::Parse` if the body is not RSS
pub fn parse_feed(body: &str, source_url: &str) -> FeedResult<SeriesFeed> {
    let channel = Channel::read_from(body.as_bytes())?;

    let items: Vec<Item> = channel.items().iter().filter_map(convert_item).collect();
    debug!("Parsed {} items from {}", items.len(), source_url);

    Ok(SeriesFeed {
        title: channel.title().trim().to_string(),
        source_url: source_url.to_string(),
        items,
    })
}

fn convert_item(entry: &rss::Item) -> Option<Item> {
    let landing_url = entry
        .link()
        .or_else(|| entry.guid().map(|g| g.value()))
        .map(str::trim)
        .filter(|link| !link.is_empty());

    let Some(landing_url) = landing_url else {
        warn!(
            "Skipping feed item without a link: {}",
            entry.title().unwrap_or("<untitled>")
        );
        return None;
    };

    let Some(id) = episode_id_from_link(landing_url) else {
        warn!("Skipping feed item with unusable link: {}", landing_url);
        return None;
    };

    let title = entry.title().unwrap_or_default().trim().to_string();
    let range = episodes::MIN_EPISODE_NUMBER..=episodes::MAX_EPISODE_NUMBER;
    let feed_episode_number = entry
        .itunes_ext()
        .and_then(|ext| ext.episode())
        .and_then(|n| n.trim().parse::<u32>().ok())
        .filter(|n| range.contains(n))
        .or_else(|| extract_episode_number(&title));

    let mut media = Vec::new();
    if let Some(enclosure) = entry.enclosure() {
        media.push(Enclosure {
            url: enclosure.url().to_string(),
            length: parse_length(enclosure.length()),
            mime_type: non_empty(enclosure.mime_type()),
        });
    }
    media.extend(media_content(entry).map(|ext| Enclosure {
        url: ext.attrs().get("url").cloned().unwrap_or_default(),
        length: ext.attrs().get("fileSize").and_then(|s| parse_length(s)),
        mime_type: ext.attrs().get("type").cloned(),
    }));
    media.retain(|m| !m.url.is_empty());

    Some(Item {
        id,
        landing_url: landing_url.to_string(),
        title,
        feed_episode_number,
        published: entry.pub_date().map(str::to_string),
        media,
    })
}

fn media_content(entry: &rss::Item) -> impl Iterator<Item = &Extension> {
    entry
        .extensions()
        .get("media")
        .and_then(|media| media.get("content"))
        .into_iter()
        .flatten()
}

fn parse_length(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|len| *len > 0)
}

fn non_empty(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}
