//! Data models for Podcast Fetcher
//!
//! This module defines the core data structures used throughout the application:
//! feed items as read from RSS, the metadata resolved for each of them, and the
//! small enums that carry user preferences (audio quality, container format).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::files;

/// Preferred audio quality when a page offers several renditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    /// Highest bitrate rendition
    High,
    /// Default rendition
    Medium,
    /// Smallest rendition
    Low,
}

impl Default for AudioQuality {
    fn default() -> Self {
        Self::Medium
    }
}

impl AudioQuality {
    /// Full fallback ordering starting with this quality
    pub fn preference_order(self) -> [AudioQuality; 3] {
        match self {
            Self::High => [Self::High, Self::Medium, Self::Low],
            Self::Medium => [Self::Medium, Self::High, Self::Low],
            Self::Low => [Self::Low, Self::Medium, Self::High],
        }
    }

    /// Marker that identifies this quality inside an audio URL
    pub fn marker(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

impl FromStr for AudioQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown audio quality '{}'", other)),
        }
    }
}

/// Container format preference for saved episodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Detect from Content-Type, then from the URL
    #[default]
    Auto,
    /// Always save as .mp3
    Mp3,
    /// Always save as .m4a
    M4a,
}

impl AudioFormat {
    /// Forced extension, if the user picked one
    pub fn forced_extension(self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::Mp3 => Some("mp3"),
            Self::M4a => Some("m4a"),
        }
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "mp3" => Ok(Self::Mp3),
            "m4a" => Ok(Self::M4a),
            other => Err(format!("unknown audio format '{}'", other)),
        }
    }
}

/// A feed-declared media reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enclosure {
    /// Media URL
    pub url: String,
    /// Declared byte length, when the feed provides a usable one
    pub length: Option<u64>,
    /// Declared MIME type
    pub mime_type: Option<String>,
}

impl Enclosure {
    /// Whether the URL names an audio container we know how to save
    pub fn is_audio(&self) -> bool {
        is_audio_container(&self.url)
    }
}

/// One episode as described by the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Stable identity: last path segment of the landing page URL
    pub id: String,
    /// Landing page URL; also the cache key
    pub landing_url: String,
    /// Feed title
    pub title: String,
    /// Numeric index from the feed (itunes:episode, else parsed from the title)
    pub feed_episode_number: Option<u32>,
    /// Raw publication date text
    pub published: Option<String>,
    /// Enclosure plus any media:content links, in feed order
    pub media: Vec<Enclosure>,
}

impl Item {
    /// First media link that points at a recognized audio container
    pub fn primary_enclosure(&self) -> Option<&Enclosure> {
        self.media.iter().find(|e| e.is_audio())
    }

    /// Declared byte length of the primary enclosure
    pub fn enclosure_length(&self) -> Option<u64> {
        self.primary_enclosure().and_then(|e| e.length)
    }
}

/// A parsed series feed
#[derive(Debug, Clone)]
pub struct SeriesFeed {
    /// Channel title; never empty
    pub title: String,
    /// Feed URL the series was read from
    pub source_url: String,
    /// Items in feed order
    pub items: Vec<Item>,
}

/// Where the resolved metadata came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Landing page fetched and scraped
    LandingPage,
    /// Landing page unreachable; feed data only
    FeedFallback,
}

/// Output of resolving one feed item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    /// Audio URL; `None` means the item cannot be downloaded
    pub audio_url: Option<String>,
    /// Episode number, page value preferred over feed value
    pub episode_number: Option<u32>,
    /// Long description, used for file names
    pub description: String,
    /// Short display title
    pub display_title: String,
    /// Author from the landing page
    pub author: Option<String>,
    /// Which source produced this record
    pub source: ResolutionSource,
}

impl ResolvedMetadata {
    /// Degraded record built from the feed alone
    pub fn from_feed(item: &Item) -> Self {
        Self {
            audio_url: item.primary_enclosure().map(|e| e.url.clone()),
            episode_number: item.feed_episode_number,
            description: item.title.clone(),
            display_title: item.title.clone(),
            author: None,
            source: ResolutionSource::FeedFallback,
        }
    }
}

/// An episode ready for the download phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    /// Stable identity
    pub id: String,
    /// Landing page URL
    pub landing_url: String,
    /// Feed title
    pub title: String,
    /// Resolved audio URL
    pub audio_url: String,
    /// Resolved episode number
    pub episode_number: Option<u32>,
    /// Resolved description
    pub description: String,
    /// Resolved display title
    pub display_title: String,
    /// Raw publication date text
    pub published: Option<String>,
    /// Feed-declared enclosure length
    pub enclosure_length: Option<u64>,
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.episode_number {
            Some(n) => write!(f, "#{} {}", n, self.title),
            None => write!(f, "{}", self.title),
        }
    }
}

/// Whether a URL names one of the recognized audio containers
pub fn is_audio_container(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    files::AUDIO_EXTENSIONS.iter().any(|ext| lower.contains(ext))
}

/// Derive an item identity from its landing page URL
pub fn episode_id_from_link(link: &str) -> Option<String> {
    link.split(['?', '#'])
        .next()
        .unwrap_or(link)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(str::to_string)
}

/// Pick the file extension (without dot) for a download
///
/// A forced format wins, then the Content-Type reported by the server, then
/// the URL, then the default container.
pub fn file_extension(url: &str, content_type: Option<&str>, format: AudioFormat) -> &'static str {
    if let Some(ext) = format.forced_extension() {
        return ext;
    }

    if let Some(content_type) = content_type {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("audio/mpeg") || content_type.contains("audio/mp3") {
            return "mp3";
        }
        if content_type.contains("audio/mp4") || content_type.contains("audio/m4a") {
            return "m4a";
        }
    }

    let url = url.to_ascii_lowercase();
    if url.contains(".mp3") {
        "mp3"
    } else if url.contains(".m4a") {
        "m4a"
    } else {
        files::DEFAULT_AUDIO_EXTENSION
    }
}
