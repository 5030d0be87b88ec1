//! Shared WhatsApp parsing utilities.
//!
//! This module contains the timestamp-line formats and the date helpers used
//! by the line parser, the checkpoint filter and the regex fallback extractor.
//! Every recognized format is day-first with a two-digit year.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

/// `chrono` format of the date part of a normalized timestamp.
pub const MESSAGE_DATE_FORMAT: &str = "%d/%m/%y";

/// `chrono` format of a normalized timestamp.
pub const MESSAGE_DATETIME_FORMAT: &str = "%d/%m/%y %H:%M:%S";

/// Timestamp-line formats, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// Bracketed with seconds.
    /// Example: `[01/10/25, 18:02:13] Ana: Hola`
    BracketedSeconds,
    /// Bracketed without seconds.
    /// Example: `[01/10/25, 18:02] Ana: Hola`
    BracketedMinutes,
    /// Unbracketed, dash separated.
    /// Example: `01/10/25, 18:02 - Ana: Hola`
    Dash,
}

impl TimestampFormat {
    /// Returns regex pattern for this format.
    ///
    /// Captures: date, time, author, text.
    pub fn pattern(self) -> &'static str {
        match self {
            TimestampFormat::BracketedSeconds => {
                r"^\[(\d{2}/\d{2}/\d{2}),\s*(\d{2}:\d{2}:\d{2})\]\s*([^:]+):\s*(.*)$"
            }
            TimestampFormat::BracketedMinutes => {
                r"^\[(\d{2}/\d{2}/\d{2}),\s*(\d{2}:\d{2})\]\s*([^:]+):\s*(.*)$"
            }
            TimestampFormat::Dash => {
                r"^(\d{2}/\d{2}/\d{2}),\s*(\d{2}:\d{2})\s*-\s*([^:]+):\s*(.*)$"
            }
        }
    }

    /// Returns `true` if the time capture omits seconds.
    pub fn lacks_seconds(self) -> bool {
        !matches!(self, TimestampFormat::BracketedSeconds)
    }

    /// Returns all formats in priority order.
    pub fn all() -> &'static [TimestampFormat] {
        &[
            TimestampFormat::BracketedSeconds,
            TimestampFormat::BracketedMinutes,
            TimestampFormat::Dash,
        ]
    }
}

/// A recognized header line, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine<'a> {
    /// Which format matched.
    pub format: TimestampFormat,
    /// Normalized `DD/MM/YY HH:MM:SS` timestamp.
    pub timestamp: String,
    /// Trimmed author.
    pub author: &'a str,
    /// Trimmed message text.
    pub text: &'a str,
}

/// Compiled matchers for every [`TimestampFormat`].
pub struct HeaderMatcher {
    matchers: Vec<(TimestampFormat, Regex)>,
}

impl HeaderMatcher {
    /// Compiles all formats.
    pub fn new() -> Self {
        let matchers = TimestampFormat::all()
            .iter()
            .map(|&format| {
                // Patterns are compile-time constants.
                let regex = Regex::new(format.pattern()).expect("valid timestamp pattern");
                (format, regex)
            })
            .collect();
        Self { matchers }
    }

    /// Tries each format in priority order; first match wins.
    pub fn match_line<'a>(&self, line: &'a str) -> Option<HeaderLine<'a>> {
        self.matchers.iter().find_map(|(format, regex)| {
            let caps = regex.captures(line)?;
            let date = caps.get(1)?.as_str();
            let time = caps.get(2)?.as_str();
            let author = caps.get(3)?.as_str().trim();
            let text = caps.get(4).map_or("", |m| m.as_str().trim());
            Some(HeaderLine {
                format: *format,
                timestamp: normalize_timestamp(date, time, *format),
                author,
                text,
            })
        })
    }
}

impl Default for HeaderMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Joins date and time, padding minute-precision times with `:00`.
pub fn normalize_timestamp(date: &str, time: &str, format: TimestampFormat) -> String {
    if format.lacks_seconds() {
        format!("{date} {time}:00")
    } else {
        format!("{date} {time}")
    }
}

/// Parses the leading date component of a raw timestamp.
pub fn parse_message_date(timestamp: &str) -> Option<NaiveDate> {
    let date_part = timestamp.split_whitespace().next()?;
    let date_part = date_part.trim_end_matches(',');
    NaiveDate::parse_from_str(date_part, MESSAGE_DATE_FORMAT).ok()
}

/// Parses a full `DD/MM/YY HH:MM:SS` timestamp.
pub fn parse_message_datetime(timestamp: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(timestamp.trim(), MESSAGE_DATETIME_FORMAT).ok()
}

/// Converts a raw timestamp to `YYYY-MM-DD`.
///
/// Tries the full timestamp first, then the date component alone.
pub fn to_iso_date(timestamp: &str) -> Option<String> {
    parse_message_datetime(timestamp)
        .map(|dt| dt.date())
        .or_else(|| parse_message_date(timestamp))
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Converts a raw timestamp to an RFC 3339 instant in UTC.
pub fn to_iso_datetime(timestamp: &str) -> Option<String> {
    parse_message_datetime(timestamp).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S+00:00").to_string())
}

static BLOCK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d{2}/\d{2}/\d{2}),?\s*(\d{2}:\d{2}(?::\d{2})?)\]\s*([^:]+):\s?(.*)$")
        .expect("valid block line pattern")
});

/// Splits a `[timestamp] author: text` block line.
///
/// Accepts both the block rendering (`[01/10/25 18:02:13]`) and the raw
/// export rendering (`[01/10/25, 18:02:13]`). Returns timestamp, author, text.
pub fn split_block_line(line: &str) -> Option<(String, &str, &str)> {
    let caps = BLOCK_LINE.captures(line)?;
    let date = caps.get(1)?.as_str();
    let time = caps.get(2)?.as_str();
    let timestamp = if time.len() == 5 {
        format!("{date} {time}:00")
    } else {
        format!("{date} {time}")
    };
    Some((
        timestamp,
        caps.get(3)?.as_str().trim(),
        caps.get(4).map_or("", |m| m.as_str()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_bracketed_seconds() {
        let matcher = HeaderMatcher::new();
        let h = matcher
            .match_line("[01/10/25, 18:02:13] Ana: Hola mundo")
            .unwrap();
        assert_eq!(h.format, TimestampFormat::BracketedSeconds);
        assert_eq!(h.timestamp, "01/10/25 18:02:13");
        assert_eq!(h.author, "Ana");
        assert_eq!(h.text, "Hola mundo");
    }

    #[test]
    fn test_match_bracketed_minutes() {
        let matcher = HeaderMatcher::new();
        let h = matcher.match_line("[01/10/25, 18:02] Ana: Hola").unwrap();
        assert_eq!(h.format, TimestampFormat::BracketedMinutes);
        assert_eq!(h.timestamp, "01/10/25 18:02:00");
    }

    #[test]
    fn test_match_dash() {
        let matcher = HeaderMatcher::new();
        let h = matcher
            .match_line("02/10/25, 19:30 - Luis Pérez: ¿Cómo estás?")
            .unwrap();
        assert_eq!(h.format, TimestampFormat::Dash);
        assert_eq!(h.timestamp, "02/10/25 19:30:00");
        assert_eq!(h.author, "Luis Pérez");
        assert_eq!(h.text, "¿Cómo estás?");
    }

    #[test]
    fn test_no_match() {
        let matcher = HeaderMatcher::new();
        assert!(matcher.match_line("- 200g harina").is_none());
        assert!(matcher.match_line("[1/15/24, 10:30:45 AM] Alice: Hi").is_none());
        assert!(matcher.match_line("01/10/2025, 18:02 - Ana: Hola").is_none());
    }

    #[test]
    fn test_text_keeps_inner_colons() {
        let matcher = HeaderMatcher::new();
        let h = matcher
            .match_line("[01/10/25, 18:02:13] Ana: Ingredientes: harina")
            .unwrap();
        assert_eq!(h.author, "Ana");
        assert_eq!(h.text, "Ingredientes: harina");
    }

    #[test]
    fn test_parse_message_date() {
        assert_eq!(
            parse_message_date("05/03/24 10:00:00"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(
            parse_message_date("05/03/24, 10:00"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert!(parse_message_date("32/13/24 10:00:00").is_none());
        assert!(parse_message_date("").is_none());
    }

    #[test]
    fn test_to_iso_date() {
        assert_eq!(to_iso_date("01/10/25 18:02:13").as_deref(), Some("2025-10-01"));
        assert_eq!(to_iso_date("01/10/25 99:99").as_deref(), Some("2025-10-01"));
        assert!(to_iso_date("garbage").is_none());
    }

    #[test]
    fn test_to_iso_datetime() {
        assert_eq!(
            to_iso_datetime("01/10/25 18:02:13").as_deref(),
            Some("2025-10-01T18:02:13+00:00")
        );
        assert!(to_iso_datetime("01/10/25").is_none());
    }

    #[test]
    fn test_split_block_line() {
        let (ts, author, text) = split_block_line("[01/10/25 18:02:13] Ana: Receta: flan").unwrap();
        assert_eq!(ts, "01/10/25 18:02:13");
        assert_eq!(author, "Ana");
        assert_eq!(text, "Receta: flan");

        let (ts, _, _) = split_block_line("[01/10/25, 18:02] Ana: x").unwrap();
        assert_eq!(ts, "01/10/25 18:02:00");

        assert!(split_block_line("- 200g harina").is_none());
    }
}
