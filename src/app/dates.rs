//! Publication date parsing
//!
//! Feeds are inconsistent about date formats. The parser is chosen once from
//! configuration: the strict parser accepts only the RSS 2.0 (RFC 2822) form,
//! the flexible parser also understands RFC 3339 and a few naive layouts.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parses raw publication date text into a timestamp
pub trait DateParser: Send + Sync {
    /// Parse the text, returning `None` when it is not understood
    fn parse(&self, raw: &str) -> Option<DateTime<FixedOffset>>;
}

/// Accepts `%a, %d %b %Y %H:%M:%S %z` only
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictDateParser;

impl DateParser for StrictDateParser {
    fn parse(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
        let parsed = DateTime::parse_from_str(raw.trim(), "%a, %d %b %Y %H:%M:%S %z").ok();
        if parsed.is_none() {
            debug!("Could not parse date: {}", raw);
        }
        parsed
    }
}

/// Tries RFC 2822, RFC 3339 and common naive layouts (assumed UTC)
#[derive(Debug, Default, Clone, Copy)]
pub struct FlexibleDateParser;

const NAIVE_DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d %b %Y %H:%M:%S"];
const NAIVE_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d %b %Y", "%B %d, %Y"];

impl DateParser for FlexibleDateParser {
    fn parse(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
            return Some(dt);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt);
        }
        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(Utc.from_utc_datetime(&naive).into());
            }
        }
        for format in NAIVE_DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                let naive = date.and_hms_opt(0, 0, 0)?;
                return Some(Utc.from_utc_datetime(&naive).into());
            }
        }

        debug!("Could not parse date: {}", raw);
        None
    }
}

/// Which parser the run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateParsing {
    /// RFC 2822 only
    Strict,
    /// Several common formats
    #[default]
    Flexible,
}

impl DateParsing {
    /// Build the parser for this mode
    pub fn parser(self) -> Box<dyn DateParser> {
        match self {
            DateParsing::Strict => Box::new(StrictDateParser),
            DateParsing::Flexible => Box::new(FlexibleDateParser),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_DATE: &str = "Tue, 05 Mar 2024 06:00:00 +0200";

    #[test]
    fn test_strict_accepts_rss_dates_only() {
        let parser = StrictDateParser;
        let parsed = parser.parse(RSS_DATE).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-05T06:00:00+02:00");

        assert!(parser.parse("2024-03-05T06:00:00Z").is_none());
        assert!(parser.parse("").is_none());
    }

    #[test]
    fn test_flexible_formats() {
        let parser = FlexibleDateParser;
        assert!(parser.parse(RSS_DATE).is_some());
        assert!(parser.parse("2024-03-05T06:00:00+02:00").is_some());
        assert!(parser.parse("2024-03-05 06:00:00").is_some());
        assert!(parser.parse("2024-03-05").is_some());
        assert!(parser.parse("5 Mar 2024").is_some());
        assert!(parser.parse("not a date").is_none());
    }

    #[test]
    fn test_flexible_orders_consistently() {
        let parser = FlexibleDateParser;
        let earlier = parser.parse("2024-03-05").unwrap();
        let later = parser.parse(RSS_DATE).unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_mode_selection() {
        assert!(DateParsing::Strict.parser().parse("2024-03-05").is_none());
        assert!(DateParsing::Flexible.parser().parse("2024-03-05").is_some());
        assert_eq!(DateParsing::default(), DateParsing::Flexible);
    }
}
