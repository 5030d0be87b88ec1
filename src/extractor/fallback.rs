//! Local best-effort extraction.
//!
//! Used when the service is unavailable or replies with garbage. A block is
//! produced by the grouper, so every line in it belongs to one author; the
//! fallback reads it as a single recipe:
//!
//! - the first line names the recipe
//! - lines up to the first steps heading are ingredients
//! - the rest are steps
//!
//! When the line right after the title is already a steps heading, the title
//! line itself is kept as the ingredient section.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{ExtractError, Extraction, RecipeExtractor};
use crate::core::models::ExtractedRecipe;
use crate::parsing::whatsapp::{split_block_line, to_iso_datetime};

static STEPS_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:pasos?|preparaci[oó]n|instrucciones|modo de hacer|elaboraci[oó]n|steps?|method|instructions|directions)\b",
    )
    .expect("valid steps heading pattern")
});

static SECTION_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:ingredientes|ingredients)\s*:?\s*$").expect("valid section title pattern")
});

static STEPS_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:pasos?|preparaci[oó]n|instrucciones|modo de hacer|elaboraci[oó]n|steps?|method|instructions|directions)\s*:?\s*$",
    )
    .expect("valid steps title pattern")
});

static TITLE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:receta|recipe)\b\s*(?::|de\b|of\b|for\b)?\s*")
        .expect("valid title prefix pattern")
});

const PHOTO_WORDS: [&str; 5] = ["imagen", "foto", "photo", "image", "<adjunto"];

/// Warning attached to extractions produced locally.
pub const FALLBACK_WARNING: &str = "fallback_regex";

/// Regex-based extractor that never calls out.
#[derive(Debug, Clone, Default)]
pub struct RegexFallback;

impl RegexFallback {
    /// Creates the fallback.
    pub fn new() -> Self {
        Self
    }

    /// Extracts at most one recipe from `block`.
    pub fn extract_block(&self, block: &str) -> Option<ExtractedRecipe> {
        let mut author: Option<String> = None;
        let mut timestamp: Option<String> = None;
        let mut lines: Vec<String> = Vec::new();

        for raw in block.lines() {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match split_block_line(raw) {
                Some((ts, who, text)) => {
                    if author.is_none() {
                        author = Some(who.trim().to_string());
                        timestamp = Some(ts);
                    }
                    push_nonblank(&mut lines, text);
                }
                None => push_nonblank(&mut lines, raw),
            }
        }

        let author = author?;
        let (title, body) = lines.split_first()?;

        let name = recipe_name(title, &author);
        let body: Vec<&str> = if body.is_empty() || is_heading(title) {
            lines.iter().map(String::as_str).collect()
        } else {
            body.iter().map(String::as_str).collect()
        };

        let split = body.iter().position(|line| STEPS_HEADING.is_match(line));
        let (ingredients, steps) = match split {
            Some(0) if body.len() < lines.len() => (vec![title.as_str()], body.clone()),
            Some(0) => (Vec::new(), body.clone()),
            Some(idx) => (body[..idx].to_vec(), body[idx..].to_vec()),
            None => (body.clone(), Vec::new()),
        };

        let ingredients: Vec<&str> = ingredients
            .into_iter()
            .filter(|l| !SECTION_TITLE.is_match(l))
            .collect();
        if ingredients.is_empty() {
            debug!(author = %author, "fallback found no ingredients");
            return None;
        }

        let lower = block.to_lowercase();
        Some(ExtractedRecipe {
            creator: author,
            name: Some(name),
            ingredients: ingredients.join("\n"),
            steps: (!steps.is_empty()).then(|| steps.join("\n")),
            has_photo: PHOTO_WORDS.iter().any(|w| lower.contains(w)),
            message_date: timestamp.as_deref().and_then(to_iso_datetime),
        })
    }
}

fn push_nonblank(lines: &mut Vec<String>, text: &str) {
    for line in text.lines() {
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
}

fn is_heading(line: &str) -> bool {
    SECTION_TITLE.is_match(line) || STEPS_TITLE.is_match(line)
}

fn recipe_name(title: &str, author: &str) -> String {
    if is_heading(title) {
        return format!("Receta de {author}");
    }
    let name = TITLE_PREFIX.replace(title, "");
    let name = name.trim().trim_end_matches(':').trim();
    if name.is_empty() {
        format!("Receta de {author}")
    } else {
        name.to_string()
    }
}

impl RecipeExtractor for RegexFallback {
    fn extract(&mut self, block: &str) -> Result<Extraction, ExtractError> {
        let recipes: Vec<ExtractedRecipe> = self.extract_block(block).into_iter().collect();
        debug!(recipes = recipes.len(), "fallback extraction");
        Ok(Extraction::new(recipes).with_warning(FALLBACK_WARNING))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_split() {
        let block = "[01/10/25 18:02:13] Ana: Ingredients:\n- 200g harina\n- 100g azucar\nPasos:\n1. Mezclar\n2. Hornear 30 min\n";
        let recipe = RegexFallback::new().extract_block(block).unwrap();

        assert_eq!(recipe.creator, "Ana");
        assert_eq!(recipe.name.as_deref(), Some("Receta de Ana"));
        assert_eq!(recipe.ingredients, "- 200g harina\n- 100g azucar");
        assert_eq!(
            recipe.steps.as_deref(),
            Some("Pasos:\n1. Mezclar\n2. Hornear 30 min")
        );
        assert_eq!(
            recipe.message_date.as_deref(),
            Some("2025-10-01T18:02:13+00:00")
        );
        assert!(!recipe.has_photo);
    }

    #[test]
    fn test_title_line_names_recipe() {
        let block = "[02/10/25 12:10:01] Marta: Receta: Gazpacho\n[02/10/25 12:11:00] Marta: - 1 kg tomates\n[02/10/25 12:12:00] Marta: <adjunto: imagen incluida>\n";
        let recipe = RegexFallback::new().extract_block(block).unwrap();
        assert_eq!(recipe.name.as_deref(), Some("Gazpacho"));
        assert!(recipe.ingredients.starts_with("- 1 kg tomates"));
        assert!(recipe.has_photo);
    }

    #[test]
    fn test_single_line_block() {
        let block = "[01/10/25 18:02:13] Charlie: Estofado costilla 1kg costilla, 15min olla\n";
        let recipe = RegexFallback::new().extract_block(block).unwrap();
        assert_eq!(recipe.name.as_deref(), Some("Estofado costilla 1kg costilla, 15min olla"));
        assert_eq!(recipe.ingredients, "Estofado costilla 1kg costilla, 15min olla");
    }

    #[test]
    fn test_legacy_comma_timestamp() {
        let block = "[01/10/25, 18:02:13] Ana: Flan\n- 4 huevos\n";
        let recipe = RegexFallback::new().extract_block(block).unwrap();
        assert_eq!(recipe.creator, "Ana");
        assert_eq!(recipe.ingredients, "- 4 huevos");
    }

    #[test]
    fn test_steps_right_after_title() {
        let block = "[01/10/25 18:02:13] Ana: Receta: flan\n[01/10/25 18:03:00] Ana: Preparación: batir 4 huevos con 500 ml leche\n";
        let recipe = RegexFallback::new().extract_block(block).unwrap();
        assert_eq!(recipe.name.as_deref(), Some("flan"));
        assert_eq!(recipe.ingredients, "Receta: flan");
        assert_eq!(
            recipe.steps.as_deref(),
            Some("Preparación: batir 4 huevos con 500 ml leche")
        );
    }

    #[test]
    fn test_steps_only_yields_nothing() {
        let block = "[01/10/25 18:02:13] Ana: Pasos:\n1. Mezclar\n";
        assert!(RegexFallback::new().extract_block(block).is_none());
    }

    #[test]
    fn test_unstructured_text_yields_nothing() {
        assert!(RegexFallback::new().extract_block("just text").is_none());
        assert!(RegexFallback::new().extract_block("").is_none());
    }

    #[test]
    fn test_extract_marks_warning() {
        let extraction = RegexFallback::new()
            .extract("[01/10/25 18:02:13] Ana: Flan\n- 4 huevos\n")
            .unwrap();
        assert_eq!(extraction.recipes.len(), 1);
        assert_eq!(extraction.warning.as_deref(), Some(FALLBACK_WARNING));
    }
}
