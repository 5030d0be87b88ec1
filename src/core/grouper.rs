//! Groups recipe seeds with their same-author continuations.
//!
//! The scan is greedy and never backtracks. A message that opens a block pulls
//! in at most [`GrouperConfig::max_continuations`] following messages, stopping
//! at the first one that changes author or fails the continuation test. That
//! message is not lost: the outer scan resumes on it and may use it as a new
//! seed.
//!
//! # Example
//!
//! ```
//! use recipack::Message;
//! use recipack::config::GrouperConfig;
//! use recipack::core::classifier::RecipeClassifier;
//! use recipack::core::grouper::group_blocks;
//!
//! let messages = vec![
//!     Message::new("01/10/25 18:00:00", "Luis", "Buenos días"),
//!     Message::new("01/10/25 18:02:13", "Ana", "Receta: flan"),
//!     Message::new("01/10/25 18:03:00", "Ana", "- 4 huevos"),
//!     Message::new("01/10/25 18:04:00", "Luis", "¡Gracias!"),
//! ];
//!
//! let blocks = group_blocks(&messages, &RecipeClassifier::default(), &GrouperConfig::default());
//! assert_eq!(blocks.len(), 1);
//! assert_eq!(blocks[0].message_count, 2);
//! ```

use tracing::debug;

use crate::config::GrouperConfig;
use crate::core::classifier::RecipeClassifier;
use crate::message::{Block, Message};

/// Splits `messages` into candidate recipe blocks, in file order.
pub fn group_blocks(
    messages: &[Message],
    classifier: &RecipeClassifier,
    config: &GrouperConfig,
) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < messages.len() {
        let seed = &messages[i];
        if !classifier.is_recipe_seed(seed.text()) {
            i += 1;
            continue;
        }

        let mut block = Block::from_seed(seed);
        let mut j = i + 1;
        while j < messages.len() && j - i <= config.max_continuations {
            let next = &messages[j];
            if next.author() != seed.author() || !classifier.is_recipe_continuation(next.text())
            {
                break;
            }
            block.push(next);
            j += 1;
        }

        if block.is_blank() {
            debug!(timestamp = %seed.timestamp(), "dropping blank block");
        } else {
            blocks.push(block);
        }
        i = j;
    }

    debug!(messages = messages.len(), blocks = blocks.len(), "grouped messages");
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(author: &str, text: &str) -> Message {
        Message::new("01/10/25 18:00:00", author, text)
    }

    fn group(messages: &[Message]) -> Vec<Block> {
        group_blocks(
            messages,
            &RecipeClassifier::default(),
            &GrouperConfig::default(),
        )
    }

    #[test]
    fn test_no_seed_no_blocks() {
        let messages = vec![msg("Ana", "Hola"), msg("Luis", "¿Qué tal?")];
        assert!(group(&messages).is_empty());
    }

    #[test]
    fn test_single_seed_block() {
        let blocks = group(&[msg("Ana", "Receta: gazpacho")]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].author, "Ana");
        assert_eq!(blocks[0].message_count, 1);
    }

    #[test]
    fn test_author_change_stops_block() {
        let messages = vec![
            msg("Ana", "Receta: flan"),
            msg("Ana", "- 4 huevos"),
            msg("Luis", "- 1 litro de leche"),
            msg("Ana", "- azúcar"),
        ];
        let blocks = group(&messages);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].message_count, 2);
        assert!(!blocks[0].text.contains("Luis"));
    }

    #[test]
    fn test_failed_continuation_stops_block() {
        let messages = vec![
            msg("Ana", "Receta: flan"),
            msg("Ana", "jaja luego te cuento"),
            msg("Ana", "- 4 huevos"),
        ];
        let blocks = group(&messages);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].message_count, 1);
    }

    #[test]
    fn test_continuation_bound() {
        let mut messages = vec![msg("Ana", "Receta: sopa")];
        for n in 1..=8 {
            messages.push(msg("Ana", &format!("{n}. paso")));
        }
        let blocks = group(&messages);
        assert_eq!(blocks[0].message_count, 6);
    }

    #[test]
    fn test_custom_bound() {
        let messages = vec![
            msg("Ana", "Receta: sopa"),
            msg("Ana", "1. hervir"),
            msg("Ana", "2. servir"),
        ];
        let blocks = group_blocks(
            &messages,
            &RecipeClassifier::default(),
            &GrouperConfig::new().with_max_continuations(1),
        );
        assert_eq!(blocks[0].message_count, 2);
    }

    #[test]
    fn test_rejected_message_can_seed_next_block() {
        let messages = vec![
            msg("Ana", "Receta: flan"),
            msg("Luis", "Receta de pollo al curry"),
            msg("Luis", "- 1 kg pollo"),
        ];
        let blocks = group(&messages);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].author, "Luis");
        assert_eq!(blocks[1].message_count, 2);
    }

    #[test]
    fn test_consumed_messages_not_reseeded() {
        let messages = vec![
            msg("Ana", "Receta: flan"),
            msg("Ana", "Receta: natillas"),
        ];
        let blocks = group(&messages);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].message_count, 2);
    }
}
