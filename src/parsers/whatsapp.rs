//! WhatsApp TXT export parser.
//!
//! Turns raw export text into [`Message`]s. Three day-first, two-digit-year
//! header formats are recognized, tried in this order on every line:
//!
//! - `[01/10/25, 18:02:13] Ana: Hola`
//! - `[01/10/25, 18:02] Ana: Hola`
//! - `01/10/25, 18:02 - Ana: Hola`
//!
//! A line that matches none of them is kept only if it reads like recipe text
//! (see [`RecipeClassifier::is_recipe_line`]); it is then appended to the
//! message being built. Anything else, including an unparseable first line,
//! is dropped. Output is in file order.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::Message;
use crate::core::classifier::RecipeClassifier;
use crate::error::Result;
use crate::parsing::whatsapp::HeaderMatcher;

/// Parser for WhatsApp TXT exports.
///
/// # Example
///
/// ```rust
/// use recipack::parsers::ChatParser;
///
/// let parser = ChatParser::new();
/// let messages = parser.parse_str("[01/10/25, 18:02:13] Ana: Ingredientes:\n- 200g harina");
/// assert_eq!(messages.len(), 1);
/// assert_eq!(messages[0].text, "Ingredientes:\n- 200g harina");
/// ```
pub struct ChatParser {
    headers: HeaderMatcher,
    classifier: RecipeClassifier,
}

/// The message currently being assembled.
///
/// Continuation lines go here rather than into the output vector, so nothing
/// already emitted is ever touched again.
struct PendingMessage {
    timestamp: String,
    author: String,
    lines: Vec<String>,
}

impl PendingMessage {
    fn new(timestamp: String, author: &str, text: &str) -> Self {
        Self {
            timestamp,
            author: author.to_string(),
            lines: vec![text.to_string()],
        }
    }

    fn append(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn finish(self) -> Message {
        Message::new(self.timestamp, self.author, self.lines.join("\n"))
    }
}

/// Line-level outcome counters, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseSummary {
    /// Header lines turned into messages.
    pub headers: usize,
    /// Unprefixed lines attached to a message.
    pub continuations: usize,
    /// Non-blank lines dropped.
    pub discarded: usize,
}

impl ChatParser {
    /// Creates a parser using the default vocabulary.
    pub fn new() -> Self {
        Self::with_classifier(RecipeClassifier::default())
    }

    /// Creates a parser that judges continuation lines with `classifier`.
    pub fn with_classifier(classifier: RecipeClassifier) -> Self {
        Self {
            headers: HeaderMatcher::new(),
            classifier,
        }
    }

    /// Reads and parses an export file.
    pub fn parse(&self, path: &Path) -> Result<Vec<Message>> {
        let content = fs::read_to_string(path)?;
        Ok(self.parse_str(&content))
    }

    /// Parses export text.
    pub fn parse_str(&self, content: &str) -> Vec<Message> {
        self.parse_with_summary(content).0
    }

    /// Parses export text and reports what happened to each line.
    pub fn parse_with_summary(&self, content: &str) -> (Vec<Message>, ParseSummary) {
        let mut messages = Vec::new();
        let mut summary = ParseSummary::default();
        let mut pending: Option<PendingMessage> = None;

        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(header) = self.headers.match_line(line) {
                if let Some(done) = pending.take() {
                    messages.push(done.finish());
                }
                pending = Some(PendingMessage::new(
                    header.timestamp,
                    header.author,
                    header.text,
                ));
                summary.headers += 1;
                continue;
            }

            match pending.as_mut() {
                Some(current) if self.classifier.is_recipe_line(line) => {
                    current.append(line);
                    summary.continuations += 1;
                }
                _ => summary.discarded += 1,
            }
        }

        if let Some(done) = pending {
            messages.push(done.finish());
        }

        debug!(
            headers = summary.headers,
            continuations = summary.continuations,
            discarded = summary.discarded,
            "parsed chat export"
        );

        (messages, summary)
    }
}

impl Default for ChatParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_main_format() {
        let content = "[01/10/25, 18:02:12] Ana: Hola mundo\n[02/10/25, 19:30:45] Luis: ¿Cómo estás?";
        let messages = ChatParser::new().parse_str(content);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].author, "Ana");
        assert_eq!(messages[0].text, "Hola mundo");
        assert_eq!(messages[0].timestamp, "01/10/25 18:02:12");
        assert_eq!(messages[1].author, "Luis");
        assert_eq!(messages[1].text, "¿Cómo estás?");
    }

    #[test]
    fn test_parse_dash_format() {
        let content = "01/10/25, 18:02 - Ana: Hola mundo\n02/10/25, 19:30 - Luis: ¿Cómo estás?";
        let messages = ChatParser::new().parse_str(content);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].timestamp, "01/10/25 18:02:00");
        assert_eq!(messages[1].author, "Luis");
    }

    #[test]
    fn test_parse_mixed_formats_in_file_order() {
        let content = "\
02/10/25, 10:00 - Luis: segundo día
[01/10/25, 18:02] Ana: primer día
[03/10/25, 08:00:01] Marta: tercero";
        let messages = ChatParser::new().parse_str(content);
        let authors: Vec<&str> = messages.iter().map(|m| m.author()).collect();
        assert_eq!(authors, vec!["Luis", "Ana", "Marta"]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let content = "[01/10/25, 18:02:12] Ana: Hola mundo\n\n   \n[02/10/25, 19:30:45] Luis: Hey\n";
        let messages = ChatParser::new().parse_str(content);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "Hola mundo");
    }

    #[test]
    fn test_continuation_lines_appended() {
        let content = "\
[01/10/25, 18:02:13] Ana: Ingredients:
- 200g harina
- 100g azucar
Pasos:
1. Mezclar
2. Hornear 30 min";
        let (messages, summary) = ChatParser::new().parse_with_summary(content);

        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].text,
            "Ingredients:\n- 200g harina\n- 100g azucar\nPasos:\n1. Mezclar\n2. Hornear 30 min"
        );
        assert_eq!(summary.continuations, 5);
        assert_eq!(summary.discarded, 0);
    }

    #[test]
    fn test_non_recipe_orphan_dropped() {
        let content = "[01/10/25, 18:02:13] Ana: Hola\nesto no tiene nada que ver\n[01/10/25, 18:03:00] Luis: Adiós";
        let (messages, summary) = ChatParser::new().parse_with_summary(content);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "Hola");
        assert_eq!(summary.discarded, 1);
    }

    #[test]
    fn test_first_line_cannot_be_continuation() {
        let content = "- 200g harina\n[01/10/25, 18:02:13] Ana: Receta";
        let (messages, summary) = ChatParser::new().parse_with_summary(content);

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "Receta");
        assert_eq!(summary.discarded, 1);
    }

    #[test]
    fn test_system_notice_not_appended() {
        let content = "[01/10/25, 18:02:13] Ana: Flan\n<Multimedia omitido>";
        let messages = ChatParser::new().parse_str(content);
        assert_eq!(messages[0].text, "Flan");
    }

    #[test]
    fn test_empty_input() {
        assert!(ChatParser::new().parse_str("").is_empty());
        assert!(ChatParser::new().parse_str("\n\n").is_empty());
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[01/10/25, 18:02:13] Ana: Hola").unwrap();
        let messages = ChatParser::new().parse(file.path()).unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_parse_missing_file() {
        let err = ChatParser::new()
            .parse(Path::new("/definitely/not/here.txt"))
            .unwrap_err();
        assert!(err.is_io());
    }
}
