//! Text extraction helpers
//!
//! Episode numbers are pulled out of free-form titles with a fixed, ordered
//! list of patterns, and file names are derived from descriptions with a
//! sanitizer that keeps them portable across filesystems.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::constants::{episodes, files};

/// Episode-number patterns, most specific first
const EPISODE_PATTERNS: [&str; 10] = [
    r"(?i)Episode\s+(\d+)",
    r"(?i)Ep\.?\s*(\d+)",
    r"#(\d+)",
    r"(?i)Part\s+(\d+)",
    r"(?i)(\d+):00\s+nuus",
    r"(?i)S\d+E(\d+)",
    r"(?i)Season\s+\d+\s+Episode\s+(\d+)",
    r"\b(\d{1,3})\s*(?:-|–|:|$)",
    r"^(\d+)\b",
    r"\b(\d+)$",
];

fn episode_regexes() -> &'static [Regex] {
    static REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        EPISODE_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

/// Extract an episode number from free text
///
/// Patterns are tried in order; within a pattern every match is considered and
/// the first value inside the accepted range wins. Returns `None` when no
/// pattern yields an in-range number.
pub fn extract_episode_number(text: &str) -> Option<u32> {
    if text.trim().is_empty() {
        return None;
    }

    let range = episodes::MIN_EPISODE_NUMBER..=episodes::MAX_EPISODE_NUMBER;
    for regex in episode_regexes() {
        let found = regex
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| m.as_str().parse::<u32>().ok())
            .find(|n| range.contains(n));
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Turn arbitrary text into a portable file name component
///
/// Applies NFKC normalization, drops everything except word characters,
/// whitespace, `-` and `.`, collapses whitespace into `_`, lowercases, clamps
/// to `max_length` characters and trims trailing underscores.
pub fn sanitize_filename(name: &str, max_length: usize) -> String {
    if name.is_empty() {
        return files::UNNAMED.to_string();
    }

    let kept: String = name
        .nfkc()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(*c, '_' | '-' | '.'))
        .collect();
    let joined = kept.split_whitespace().collect::<Vec<_>>().join("_").to_lowercase();
    let clamped: String = joined.chars().take(max_length).collect();
    let result = clamped.trim_end_matches('_').to_string();

    if result.is_empty() {
        files::UNNAMED.to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_patterns() {
        assert_eq!(extract_episode_number("Episode 12: The Return"), Some(12));
        assert_eq!(extract_episode_number("Ep. 7 - pilot"), Some(7));
        assert_eq!(extract_episode_number("ep7"), Some(7));
        assert_eq!(extract_episode_number("Show #45"), Some(45));
        assert_eq!(extract_episode_number("Part 3 of the saga"), Some(3));
        assert_eq!(extract_episode_number("06:00 Nuus"), Some(6));
        assert_eq!(extract_episode_number("S02E05 finale"), Some(5));
    }

    #[test]
    fn test_separator_and_positional_patterns() {
        assert_eq!(extract_episode_number("Weekly Roundup 42 - guests"), Some(42));
        assert_eq!(extract_episode_number("101 things to know about nothing"), Some(101));
        assert_eq!(extract_episode_number("The big interview 2024"), Some(2024));
    }

    #[test]
    fn test_out_of_range_and_empty() {
        assert_eq!(extract_episode_number(""), None);
        assert_eq!(extract_episode_number("No digits here"), None);
        assert_eq!(extract_episode_number("Episode 0"), None);
        assert_eq!(extract_episode_number("Year 20245"), None);
    }

    #[test]
    fn test_first_in_range_match_wins() {
        // Episode 0 is rejected, the next match in the same pattern is used
        assert_eq!(extract_episode_number("Episode 0 and Episode 9"), Some(9));
    }

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(
            sanitize_filename("Hello, World! Episode 3", 80),
            "hello_world_episode_3"
        );
        assert_eq!(sanitize_filename("  spaced   out  ", 80), "spaced_out");
        assert_eq!(sanitize_filename("keep-dots.and-dashes", 80), "keep-dots.and-dashes");
    }

    #[test]
    fn test_sanitize_unicode_and_limits() {
        // NFKC folds the ligature and keeps accented word characters
        assert_eq!(sanitize_filename("ﬁle Ék", 80), "file_ék");
        assert_eq!(sanitize_filename("abc def", 4), "abc");
        assert_eq!(sanitize_filename("", 80), "unnamed");
        assert_eq!(sanitize_filename("!!!", 80), "unnamed");
    }
}
