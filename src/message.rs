//! Chat messages and the blocks built from them.
//!
//! A [`Message`] is one timestamped chat line (plus any continuation lines the
//! parser attached to it). A [`Block`] is what gets handed to the semantic
//! extractor: a recipe seed and its accepted same-author continuations,
//! rendered as `[timestamp] author: text` lines.
//!
//! # Examples
//!
//! ```
//! use recipack::Message;
//!
//! let msg = Message::new("01/10/25 18:02:13", "Ana", "Receta: flan");
//! assert_eq!(msg.author(), "Ana");
//! assert_eq!(msg.line(), "[01/10/25 18:02:13] Ana: Receta: flan");
//! assert_eq!(msg.date().map(|d| d.to_string()), Some("2025-10-01".to_string()));
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::parsing::whatsapp::{parse_message_date, parse_message_datetime};

/// One chat message as parsed from an export.
///
/// The timestamp is kept verbatim (`DD/MM/YY HH:MM:SS`) because it is echoed
/// back to the extractor inside block text; use [`date`](Message::date) and
/// [`datetime`](Message::datetime) for comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Raw locale timestamp, day first, two-digit year.
    pub timestamp: String,

    /// Display name of the sender.
    pub author: String,

    /// Message text. Continuation lines are joined with `\n`.
    pub text: String,
}

impl Message {
    /// Creates a message from its three parts.
    pub fn new(
        timestamp: impl Into<String>,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            author: author.into(),
            text: text.into(),
        }
    }

    /// Returns the sender name.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns the message text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the raw timestamp.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Calendar date of the message, if the timestamp parses.
    pub fn date(&self) -> Option<NaiveDate> {
        parse_message_date(&self.timestamp)
    }

    /// Full date and time of the message, if the timestamp parses.
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        parse_message_datetime(&self.timestamp)
    }

    /// Renders the message the way blocks present it to the extractor.
    pub fn line(&self) -> String {
        format!("[{}] {}: {}", self.timestamp, self.author, self.text)
    }
}

/// A candidate recipe span ready for semantic extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Author shared by every message in the block.
    pub author: String,

    /// Timestamp of the seed message.
    pub timestamp: String,

    /// Newline-terminated `[timestamp] author: text` lines.
    pub text: String,

    /// Number of underlying messages (seed included).
    pub message_count: usize,
}

impl Block {
    /// Opens a block from its seed message.
    pub fn from_seed(seed: &Message) -> Self {
        let mut block = Self {
            author: seed.author.clone(),
            timestamp: seed.timestamp.clone(),
            text: String::new(),
            message_count: 0,
        };
        block.push(seed);
        block
    }

    /// Appends a continuation message.
    pub fn push(&mut self, msg: &Message) {
        self.text.push_str(&msg.line());
        self.text.push('\n');
        self.message_count += 1;
    }

    /// Returns `true` if the block carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Rough token estimate (four characters per token).
    pub fn approx_tokens(&self) -> usize {
        self.text.chars().count() / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let msg = Message::new("02/10/25 12:10:01", "Marta", "Gazpacho");
        assert_eq!(msg.line(), "[02/10/25 12:10:01] Marta: Gazpacho");
    }

    #[test]
    fn test_date_parsing() {
        let msg = Message::new("31/12/24 23:59:00", "Ana", "x");
        assert_eq!(msg.date(), NaiveDate::from_ymd_opt(2024, 12, 31));
        assert!(msg.datetime().is_some());
    }

    #[test]
    fn test_unparseable_date() {
        let msg = Message::new("yesterday", "Ana", "x");
        assert!(msg.date().is_none());
        assert!(msg.datetime().is_none());
    }

    #[test]
    fn test_block_accumulates_lines() {
        let seed = Message::new("01/10/25 18:02:13", "Ana", "Receta: flan");
        let next = Message::new("01/10/25 18:03:00", "Ana", "- 4 huevos");
        let mut block = Block::from_seed(&seed);
        block.push(&next);

        assert_eq!(block.author, "Ana");
        assert_eq!(block.timestamp, "01/10/25 18:02:13");
        assert_eq!(block.message_count, 2);
        assert_eq!(
            block.text,
            "[01/10/25 18:02:13] Ana: Receta: flan\n[01/10/25 18:03:00] Ana: - 4 huevos\n"
        );
        assert!(!block.is_blank());
    }

    #[test]
    fn test_serde_roundtrip() {
        let msg = Message::new("01/10/25 18:02:13", "Ana", "hola");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
