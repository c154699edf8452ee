//! Audio URL discovery strategies
//!
//! Each strategy looks at one source of evidence and returns every candidate
//! URL it can find. The resolver runs them in [`STRATEGIES`] order and keeps
//! the first non-empty result; quality selection then picks one URL from it.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::app::models::{AudioQuality, Item};
use crate::app::resolver::page::LandingPage;
use crate::constants::iono;

/// Everything a strategy may look at
#[derive(Debug, Clone, Copy)]
pub struct AudioSearch<'a> {
    /// The feed item being resolved
    pub item: &'a Item,
    /// The scraped landing page
    pub page: &'a LandingPage,
}

/// A candidate-producing strategy
pub type Strategy = fn(&AudioSearch<'_>) -> Vec<String>;

/// Strategies in priority order, with the names used in log lines
pub const STRATEGIES: [(&str, Strategy); 5] = [
    ("feed-media", feed_media),
    ("og:audio", og_audio),
    ("audio-element", audio_element),
    ("page-state", page_state),
    ("page-body", page_body),
];

fn quality_audio_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(iono::QUALITY_AUDIO_PATTERN).ok())
        .as_ref()
}

fn any_audio_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(iono::ANY_AUDIO_PATTERN).ok())
        .as_ref()
}

/// Feed enclosure and media links that name an audio container
pub fn feed_media(search: &AudioSearch<'_>) -> Vec<String> {
    search
        .item
        .media
        .iter()
        .filter(|m| m.is_audio())
        .map(|m| m.url.clone())
        .collect()
}

/// `<meta property="og:audio">`
pub fn og_audio(search: &AudioSearch<'_>) -> Vec<String> {
    search.page.og_audio.clone()
}

/// `<audio src>` and nested `<source src>`
pub fn audio_element(search: &AudioSearch<'_>) -> Vec<String> {
    search.page.audio_sources.clone()
}

/// Quality-suffixed audio URLs embedded in serialized page state
pub fn page_state(search: &AudioSearch<'_>) -> Vec<String> {
    let Some(regex) = quality_audio_regex() else {
        return Vec::new();
    };

    search
        .page
        .state_scripts
        .iter()
        .flat_map(|script| {
            let unescaped = script.replace("\\/", "/");
            regex
                .find_iter(&unescaped)
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Any audio-host URL anywhere in the document
pub fn page_body(search: &AudioSearch<'_>) -> Vec<String> {
    let Some(regex) = any_audio_regex() else {
        return Vec::new();
    };

    regex
        .find_iter(&search.page.body)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Pick one candidate by quality preference
///
/// The first quality in preference order whose marker appears in a candidate
/// (case-insensitively) wins; otherwise the first candidate does.
pub fn select_by_quality(candidates: &[String], preferred: AudioQuality) -> Option<&String> {
    preferred
        .preference_order()
        .iter()
        .find_map(|quality| {
            candidates
                .iter()
                .find(|url| url.to_ascii_lowercase().contains(quality.marker()))
        })
        .or_else(|| candidates.first())
}

/// Resolve a possibly relative URL against the landing page
pub fn absolutize(candidate: &str, base: &str) -> String {
    if Url::parse(candidate).is_ok() {
        return candidate.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(candidate))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| candidate.to_string())
}
