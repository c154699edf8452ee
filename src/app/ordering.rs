//! Download order for resolved episodes
//!
//! Numbered episodes come first, ascending. Ties (and unnumbered episodes)
//! are broken by publication date, with missing or unparseable dates sorting
//! earliest, then by episode id so the order is total.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};

use crate::app::dates::DateParser;
use crate::app::models::Episode;

/// Precomputed sort key for one episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    episode_number: Option<u32>,
    published: Option<DateTime<FixedOffset>>,
    id: String,
}

impl OrderKey {
    /// Build the key, parsing the publication date with `parser`
    pub fn new(episode: &Episode, parser: &dyn DateParser) -> Self {
        Self {
            episode_number: episode.episode_number,
            published: episode.published.as_deref().and_then(|raw| parser.parse(raw)),
            id: episode.id.clone(),
        }
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_number = match (self.episode_number, other.episode_number) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };

        // `None < Some` puts undated episodes first
        by_number
            .then_with(|| self.published.cmp(&other.published))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort episodes into download order
pub fn sort_episodes(episodes: &mut [Episode], parser: &dyn DateParser) {
    episodes.sort_by_cached_key(|episode| OrderKey::new(episode, parser));
}
