//! Chat export parsers.
//!
//! Only WhatsApp TXT exports are supported. The parser keeps continuation
//! lines that read like recipe text and drops the rest of the chatter, so the
//! output is already biased towards recipe content.
//!
//! # Example
//!
//! ```rust
//! use recipack::parsers::ChatParser;
//!
//! let parser = ChatParser::new();
//! let (messages, summary) = parser.parse_with_summary(
//!     "[01/10/25, 18:02:13] Ana: Flan\n- 4 huevos\nqué calor hoy",
//! );
//! assert_eq!(messages.len(), 1);
//! assert_eq!(summary.continuations, 1);
//! assert_eq!(summary.discarded, 1);
//! ```

mod whatsapp;

pub use whatsapp::{ChatParser, ParseSummary};
