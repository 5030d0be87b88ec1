//! Lexical "does this look like a recipe" heuristics.
//!
//! [`RecipeClassifier`] answers three questions with increasing leniency:
//!
//! | Question | Method | Used by |
//! |----------|--------|---------|
//! | Can a block start here? | [`is_recipe_seed`](RecipeClassifier::is_recipe_seed) | grouper |
//! | Does this message extend an open block? | [`is_recipe_continuation`](RecipeClassifier::is_recipe_continuation) | grouper |
//! | Is this unprefixed export line recipe text? | [`is_recipe_line`](RecipeClassifier::is_recipe_line) | line parser |
//!
//! plus [`looks_like_ingredients`](RecipeClassifier::looks_like_ingredients),
//! a quantity-density test used to tell ingredient cells from step cells.
//!
//! All word lists come from [`Vocabulary`]; nothing is hard-coded here.
//!
//! # Example
//!
//! ```
//! use recipack::core::classifier::RecipeClassifier;
//! use recipack::config::Vocabulary;
//!
//! let classifier = RecipeClassifier::new(&Vocabulary::default());
//! assert!(classifier.is_recipe_seed("Receta: flan de huevo"));
//! assert!(classifier.is_recipe_seed("Estofado costilla 1kg costilla, 15min olla"));
//! assert!(!classifier.is_recipe_seed("¿Quedamos mañana?"));
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::config::Vocabulary;

static BULLET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-•*]\s").expect("valid bullet pattern"));

static NUMBERED_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[.)]?").expect("valid numbered pattern"));

/// Why a line was accepted as recipe continuation.
///
/// Signals are checked in this order and the first one wins: list markers,
/// then vocabulary, then quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSignal {
    /// Starts with `-`, `•` or `*` followed by whitespace.
    Bullet,
    /// Starts with a step number such as `1.` or `2)`.
    Numbered,
    /// Contains a word from the relevant vocabulary.
    Vocabulary,
    /// Contains a number followed by a unit of measure.
    Quantity,
}

/// Which seed rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSignal {
    /// Explicit indicator such as `"recipe:"` or the word `"receta"`.
    Indicator,
    /// Dish name plus a quantity, or a dish name in a short message.
    DishName,
    /// Quantity plus cooking verb.
    QuantityAndVerb,
}

/// Recipe heuristics compiled from a [`Vocabulary`].
#[derive(Debug, Clone)]
pub struct RecipeClassifier {
    vocabulary: Vocabulary,
    quantity: Option<Regex>,
    indicator_words: Option<Regex>,
    dish_names: Option<Regex>,
    cooking_verbs: Option<Regex>,
    continuation_words: Option<Regex>,
    line_words: Option<Regex>,
}

/// Word-list entries up to this many characters only match whole words.
const SHORT_ENTRY_CHARS: usize = 4;

/// Trimmed, lowercased, deduplicated entries, longest first.
fn cleaned(entries: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = entries
        .iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();
    cleaned.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    cleaned.dedup();
    cleaned
}

/// Builds `\b(?:a|b|c)\b`-style alternation, longest entries first.
fn alternation(entries: &[String]) -> Option<String> {
    let cleaned = cleaned(entries);
    if cleaned.is_empty() {
        return None;
    }
    let escaped: Vec<String> = cleaned.iter().map(|e| regex::escape(e)).collect();
    Some(escaped.join("|"))
}

/// Compiles a word list.
///
/// Short entries must stand alone ("pie" does not fire on "pienso"); longer
/// ones also match inside words, so "tortilla" still finds "tortillas".
fn word_list(entries: &[String]) -> Option<Regex> {
    let cleaned = cleaned(entries);
    if cleaned.is_empty() {
        return None;
    }
    let parts: Vec<String> = cleaned
        .iter()
        .map(|entry| {
            let escaped = regex::escape(entry);
            if entry.chars().count() > SHORT_ENTRY_CHARS {
                return escaped;
            }
            let open = if entry.starts_with(char::is_alphanumeric) { r"\b" } else { "" };
            let close = if entry.ends_with(char::is_alphanumeric) { r"\b" } else { "" };
            format!("{open}{escaped}{close}")
        })
        .collect();
    Some(
        Regex::new(&format!("(?i)(?:{})", parts.join("|")))
            .expect("escaped word list is a valid pattern"),
    )
}

fn matches(words: Option<&Regex>, text: &str) -> bool {
    words.is_some_and(|re| re.is_match(text))
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .any(|n| haystack.contains(&n.to_lowercase()))
}

impl RecipeClassifier {
    /// Compiles the classifier.
    ///
    /// Units, indicator words and the word lists become regex alternations;
    /// everything is escaped, so any vocabulary content is accepted.
    pub fn new(vocabulary: &Vocabulary) -> Self {
        let quantity = alternation(&vocabulary.units).map(|units| {
            Regex::new(&format!(r"(?i)\d+(?:[.,/]\d+)?\s*(?:{units})\b"))
                .expect("escaped unit alternation is a valid pattern")
        });
        let indicator_words = alternation(&vocabulary.indicator_words).map(|words| {
            Regex::new(&format!(r"(?i)\b(?:{words})\b"))
                .expect("escaped word alternation is a valid pattern")
        });

        Self {
            vocabulary: vocabulary.clone(),
            quantity,
            indicator_words,
            dish_names: word_list(&vocabulary.dish_names),
            cooking_verbs: word_list(&vocabulary.cooking_verbs),
            continuation_words: word_list(&vocabulary.continuation_words),
            line_words: word_list(&vocabulary.line_words),
        }
    }

    /// Returns the vocabulary this classifier was built from.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Returns `true` if `text` contains a number followed by a unit.
    pub fn has_quantity(&self, text: &str) -> bool {
        self.quantity.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Counts quantity-with-unit occurrences in `text`.
    pub fn quantity_count(&self, text: &str) -> usize {
        self.quantity
            .as_ref()
            .map_or(0, |re| re.find_iter(text).count())
    }

    /// Decides whether a message can open a recipe block.
    pub fn is_recipe_seed(&self, text: &str) -> bool {
        self.seed_signal(text).is_some()
    }

    /// Returns the first seed rule that fires, in precedence order.
    pub fn seed_signal(&self, text: &str) -> Option<SeedSignal> {
        let lower = text.to_lowercase();

        if contains_any(&lower, &self.vocabulary.indicator_phrases)
            || self
                .indicator_words
                .as_ref()
                .is_some_and(|re| re.is_match(&lower))
        {
            return Some(SeedSignal::Indicator);
        }

        let has_quantity = self.has_quantity(text);

        if matches(self.dish_names.as_ref(), &lower)
            && (has_quantity
                || text.split_whitespace().count() <= self.vocabulary.short_message_words)
        {
            return Some(SeedSignal::DishName);
        }

        if has_quantity && matches(self.cooking_verbs.as_ref(), &lower) {
            return Some(SeedSignal::QuantityAndVerb);
        }

        None
    }

    /// Decides whether a message extends an already open block.
    pub fn is_recipe_continuation(&self, text: &str) -> bool {
        self.continuation_signal(text).is_some()
    }

    /// Returns why a message extends a block, if it does.
    pub fn continuation_signal(&self, text: &str) -> Option<LineSignal> {
        self.line_signal(text, self.continuation_words.as_ref())
    }

    /// Decides whether an unprefixed export line belongs to the previous message.
    ///
    /// Blank lines and WhatsApp system notices never do.
    pub fn is_recipe_line(&self, line: &str) -> bool {
        let lower = line.trim().to_lowercase();
        if lower.is_empty() || contains_any(&lower, &self.vocabulary.ignored_line_markers) {
            return false;
        }
        self.line_signal(line, self.line_words.as_ref()).is_some()
    }

    /// Returns `true` if `text` is dense in quantities, i.e. reads like an
    /// ingredient list rather than instructions.
    pub fn looks_like_ingredients(&self, text: &str, threshold: usize) -> bool {
        self.quantity_count(text) > threshold
    }

    fn line_signal(&self, text: &str, words: Option<&Regex>) -> Option<LineSignal> {
        if BULLET_PREFIX.is_match(text) {
            return Some(LineSignal::Bullet);
        }
        if NUMBERED_PREFIX.is_match(text) {
            return Some(LineSignal::Numbered);
        }
        if matches(words, text) {
            return Some(LineSignal::Vocabulary);
        }
        if self.has_quantity(text) {
            return Some(LineSignal::Quantity);
        }
        None
    }
}

impl Default for RecipeClassifier {
    fn default() -> Self {
        Self::new(&Vocabulary::default())
    }
}
