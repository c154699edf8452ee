//! Persisted per-episode metadata

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::models::{Item, ResolutionSource, ResolvedMetadata};

/// Keys an entry must carry (possibly as `null`) to be usable
pub const REQUIRED_KEYS: [&str; 3] = ["html_ep_num", "audio_url", "description"];

/// One cached resolution, keyed by landing page URL
///
/// Field names match the on-disk document written by earlier versions of the
/// tool, so existing `cache.json` files keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Episode number resolved from the landing page (or the feed)
    pub html_ep_num: Option<u32>,
    /// Feed title
    #[serde(default)]
    pub title: String,
    /// Resolved audio URL
    pub audio_url: Option<String>,
    /// Resolved description
    pub description: String,
    /// Page title, used for short file names
    #[serde(default)]
    pub display_title: Option<String>,
    /// Page author
    #[serde(default)]
    pub author: Option<String>,
    /// Item identity
    #[serde(default)]
    pub episode_id: String,
    /// Raw publication date
    #[serde(default)]
    pub pub_date: Option<String>,
    /// Feed-declared enclosure length
    #[serde(default)]
    pub enclosure_length: Option<u64>,
}

impl CacheEntry {
    /// Build an entry from a feed item and its resolution
    pub fn new(item: &Item, meta: &ResolvedMetadata) -> Self {
        Self {
            html_ep_num: meta.episode_number,
            title: item.title.clone(),
            audio_url: meta.audio_url.clone(),
            description: meta.description.clone(),
            display_title: Some(meta.display_title.clone()),
            author: meta.author.clone(),
            episode_id: item.id.clone(),
            pub_date: item.published.clone(),
            enclosure_length: item.enclosure_length(),
        }
    }

    /// Turn the entry back into resolved metadata
    ///
    /// Entries written before `display_title` existed fall back to the feed
    /// title.
    pub fn to_metadata(&self) -> ResolvedMetadata {
        ResolvedMetadata {
            audio_url: self.audio_url.clone(),
            episode_number: self.html_ep_num,
            description: self.description.clone(),
            display_title: self
                .display_title
                .clone()
                .unwrap_or_else(|| self.title.clone()),
            author: self.author.clone(),
            source: ResolutionSource::LandingPage,
        }
    }

    /// Validate and decode a raw document value
    ///
    /// Returns `None` for values that are not objects, lack a required key,
    /// or carry fields of the wrong type.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if !REQUIRED_KEYS.iter().all(|key| object.contains_key(*key)) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}
