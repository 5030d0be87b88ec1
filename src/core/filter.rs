//! Incremental-resume filtering.
//!
//! A [`Checkpoint`] is an ISO date meaning "everything before this day has
//! already been processed". This module drops messages older than the
//! checkpoint, decides which checkpoint applies to a run, and derives the next
//! checkpoint from what a run saw.
//!
//! | Step | Function |
//! |------|----------|
//! | Pick explicit or stored checkpoint | [`resolve_checkpoint`] |
//! | Drop already-processed messages | [`filter_since`] |
//! | Derive the next checkpoint | [`checkpoint_from_messages`] |
//!
//! # Behavior Notes
//!
//! - Messages whose timestamp cannot be parsed are **kept**
//! - The checkpoint day itself is kept (inclusive)
//! - An unparseable checkpoint disables filtering and logs a warning
//!
//! # Example
//!
//! ```
//! use recipack::Message;
//! use recipack::core::filter::filter_since;
//!
//! let messages = vec![
//!     Message::new("30/09/25 10:00:00", "Ana", "Old"),
//!     Message::new("01/10/25 09:00:00", "Ana", "Same day"),
//!     Message::new("garbled", "Ana", "No date"),
//! ];
//!
//! let kept = filter_since(messages, Some("2025-10-01"));
//! assert_eq!(kept.len(), 2);
//! assert_eq!(kept[0].text, "Same day");
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Message;
use crate::error::RecipackError;
use crate::parsing::whatsapp::to_iso_date;

/// Format of persisted checkpoints.
pub const CHECKPOINT_FORMAT: &str = "%Y-%m-%d";

/// A processed-up-to date, inclusive of the day itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checkpoint(NaiveDate);

impl Checkpoint {
    /// Wraps a calendar date.
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parses a `YYYY-MM-DD` string.
    ///
    /// # Errors
    ///
    /// Returns [`RecipackError::InvalidDate`] if the format is invalid.
    pub fn parse(input: &str) -> Result<Self, RecipackError> {
        NaiveDate::parse_from_str(input.trim(), CHECKPOINT_FORMAT)
            .map(Self)
            .map_err(|_| RecipackError::invalid_date(input))
    }

    /// The underlying date.
    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// Returns `true` if a message dated `date` has not been processed yet.
    pub fn admits(self, date: NaiveDate) -> bool {
        date >= self.0
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CHECKPOINT_FORMAT))
    }
}

impl FromStr for Checkpoint {
    type Err = RecipackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Checkpoint {
    type Error = RecipackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Checkpoint> for String {
    fn from(value: Checkpoint) -> Self {
        value.to_string()
    }
}

/// Drops messages dated before `checkpoint`.
///
/// `None` or an unparseable checkpoint returns `messages` unchanged; the
/// latter is logged as a warning. Messages with an unparseable timestamp are
/// always kept.
pub fn filter_since(messages: Vec<Message>, checkpoint: Option<&str>) -> Vec<Message> {
    let Some(raw) = checkpoint else {
        return messages;
    };

    let checkpoint = match Checkpoint::parse(raw) {
        Ok(cp) => cp,
        Err(err) => {
            warn!(checkpoint = raw, error = %err, "ignoring unparseable checkpoint");
            return messages;
        }
    };

    let before = messages.len();
    let kept: Vec<Message> = messages
        .into_iter()
        .filter(|msg| msg.date().is_none_or(|date| checkpoint.admits(date)))
        .collect();

    debug!(
        %checkpoint,
        before,
        after = kept.len(),
        "filtered messages by checkpoint"
    );
    kept
}

/// Picks the checkpoint for a run: caller-supplied first, then stored.
pub fn resolve_checkpoint(explicit: Option<String>, stored: Option<String>) -> Option<String> {
    explicit
        .filter(|s| !s.trim().is_empty())
        .or_else(|| stored.filter(|s| !s.trim().is_empty()))
}

/// Derives the next checkpoint from the last message of the *unfiltered* list.
///
/// Returns `None` for an empty list or when the last timestamp does not
/// convert, which clears the stored checkpoint instead of leaving it stale.
pub fn checkpoint_from_messages(messages: &[Message]) -> Option<String> {
    let last = messages.last()?;
    let iso = to_iso_date(last.timestamp());
    if iso.is_none() {
        warn!(
            timestamp = last.timestamp(),
            "last message has no usable date; clearing checkpoint"
        );
    }
    iso
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(ts: &str, text: &str) -> Message {
        Message::new(ts, "Ana", text)
    }

    #[test]
    fn test_no_checkpoint_keeps_everything() {
        let messages = vec![msg("01/01/20 00:00:00", "a"), msg("01/01/25 00:00:00", "b")];
        assert_eq!(filter_since(messages.clone(), None), messages);
    }

    #[test]
    fn test_filter_drops_older() {
        let messages = vec![
            msg("30/09/25 23:59:59", "old"),
            msg("01/10/25 00:00:00", "same"),
            msg("02/10/25 12:00:00", "new"),
        ];
        let kept = filter_since(messages, Some("2025-10-01"));
        let texts: Vec<&str> = kept.iter().map(|m| m.text()).collect();
        assert_eq!(texts, vec!["same", "new"]);
    }

    #[test]
    fn test_unparseable_message_date_retained() {
        let messages = vec![msg("??", "keep me"), msg("01/01/20 10:00:00", "drop me")];
        let kept = filter_since(messages, Some("2025-01-01"));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "keep me");
    }

    #[test]
    fn test_invalid_checkpoint_is_noop() {
        let messages = vec![msg("01/01/20 10:00:00", "a")];
        let kept = filter_since(messages.clone(), Some("01/01/2025"));
        assert_eq!(kept, messages);
    }

    #[test]
    fn test_resolve_precedence() {
        assert_eq!(
            resolve_checkpoint(Some("2025-01-01".into()), Some("2024-01-01".into())),
            Some("2025-01-01".to_string())
        );
        assert_eq!(
            resolve_checkpoint(None, Some("2024-01-01".into())),
            Some("2024-01-01".to_string())
        );
        assert_eq!(
            resolve_checkpoint(Some("  ".into()), Some("2024-01-01".into())),
            Some("2024-01-01".to_string())
        );
        assert_eq!(resolve_checkpoint(None, None), None);
    }

    #[test]
    fn test_checkpoint_from_last_message() {
        let messages = vec![msg("05/10/25 10:00:00", "later"), msg("03/10/25 10:00:00", "last")];
        assert_eq!(
            checkpoint_from_messages(&messages),
            Some("2025-10-03".to_string())
        );
    }

    #[test]
    fn test_checkpoint_cleared_on_bad_timestamp() {
        assert_eq!(checkpoint_from_messages(&[msg("nope", "x")]), None);
        assert_eq!(checkpoint_from_messages(&[]), None);
    }

    #[test]
    fn test_checkpoint_type() {
        let cp: Checkpoint = "2025-10-01".parse().unwrap();
        assert_eq!(cp.to_string(), "2025-10-01");
        assert!(cp.admits(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()));
        assert!(!cp.admits(NaiveDate::from_ymd_opt(2025, 9, 30).unwrap()));
        assert!(matches!(
            Checkpoint::parse("2025/10/01"),
            Err(RecipackError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_checkpoint_serde() {
        let cp = Checkpoint::parse("2025-10-01").unwrap();
        assert_eq!(serde_json::to_string(&cp).unwrap(), "\"2025-10-01\"");
        let back: Checkpoint = serde_json::from_str("\"2025-10-01\"").unwrap();
        assert_eq!(back, cp);
        assert!(serde_json::from_str::<Checkpoint>("\"bad\"").is_err());
    }
}
