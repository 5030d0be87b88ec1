//! Shared parsing utilities.
//!
//! Timestamp formats and date helpers used by the line parser, the checkpoint
//! filter and the fallback extractor live here so that every component agrees
//! on what a message date is.

pub mod whatsapp;

pub use whatsapp::{
    HeaderLine, HeaderMatcher, MESSAGE_DATE_FORMAT, MESSAGE_DATETIME_FORMAT, TimestampFormat,
    normalize_timestamp, parse_message_date, parse_message_datetime, split_block_line,
    to_iso_date, to_iso_datetime,
};
