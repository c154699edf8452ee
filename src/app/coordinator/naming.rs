//! Series directory and episode file names

use crate::app::models::Episode;
use crate::app::text::sanitize_filename;

/// Name of the series directory
///
/// An explicit name wins, then the author from the first landing page, then
/// the feed title.
pub fn series_dir_name(
    explicit: Option<&str>,
    author: Option<&str>,
    feed_title: &str,
    max_length: usize,
) -> String {
    let source = explicit
        .filter(|s| !s.trim().is_empty())
        .or(author.filter(|s| !s.trim().is_empty()))
        .unwrap_or(feed_title);
    sanitize_filename(source, max_length)
}

/// File name without extension: `<sanitized name>_<episode id>`
///
/// The description names the file unless short names were requested or the
/// description would not fit, in which case the display title does.
pub fn episode_file_stem(episode: &Episode, short_names: bool, max_length: usize) -> String {
    let source = if short_names || episode.description.chars().count() > max_length {
        &episode.display_title
    } else {
        &episode.description
    };
    format!("{}_{}", sanitize_filename(source, max_length), episode.id)
}
