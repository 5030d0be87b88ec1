//! Semantic extraction of recipes from blocks.
//!
//! The extraction service itself is external; this module defines the seam
//! ([`RecipeExtractor`]) and the local tiers around it:
//!
//! - [`parse_reply`] - tolerant decoding of service replies
//! - [`ResilientExtractor`] - pacing, retries and fallback around any extractor
//! - [`RegexFallback`] - best-effort local extraction
//! - [`CommandExtractor`] - an extractor backed by an external command
//!
//! # Example
//!
//! ```
//! use recipack::config::ExtractionConfig;
//! use recipack::extractor::{RecipeExtractor, RegexFallback, ResilientExtractor};
//!
//! // Any extractor works; the fallback on its own never calls out.
//! let mut extractor = ResilientExtractor::new(
//!     RegexFallback::new(),
//!     ExtractionConfig::new().with_min_interval_ms(0),
//! );
//! let result = extractor
//!     .extract("[01/10/25 18:02:13] Ana: Flan\n[01/10/25 18:03:00] Ana: - 4 huevos\n")
//!     .unwrap();
//! assert_eq!(result.recipes.len(), 1);
//! ```

mod command;
mod fallback;
mod reply;
mod retry;

use thiserror::Error;

use crate::core::models::ExtractedRecipe;

pub use command::CommandExtractor;
pub use fallback::{FALLBACK_WARNING, RegexFallback};
pub use reply::parse_reply;
pub use retry::{Clock, ExtractionPhase, RateLimiter, ResilientExtractor, SystemClock};

/// Instructions sent ahead of every block.
pub const EXTRACTION_PROMPT: &str = r#"Extrae recetas de este chat. Responde SOLO con JSON válido.

IMPORTANTE:
- Los INGREDIENTES son OBLIGATORIOS - sin ellos NO es una receta válida
- Los ingredientes pueden estar marcados con "-", "*", números, o separados por comas
- Los pasos pueden empezar con números, guiones, o palabras como "mezclar", "hornear", "cocinar"
- Si encuentras "Ingredientes:" o "Pasos:" úsalos como separadores
- Combina mensajes del mismo autor si forman parte de la misma receta

Formato:
{"recetas": [{"creador": "...", "nombre_receta": "...", "ingredientes": "...", "pasos_preparacion": "...", "tiene_foto": false, "fecha_mensaje": "YYYY-MM-DDTHH:MM:SS+00:00"}]}

REGLAS:
- Combina todos los ingredientes en un solo campo de texto separado por comas
- Combina todos los pasos en un solo campo de texto
- Usa el nombre EXACTO de la persona del mensaje
- Si hay "<adjunto:" o "imagen" marca "tiene_foto": true
- Si no hay recetas válidas (sin ingredientes): {"recetas": []}
- NO agregues texto fuera del JSON"#;

/// Builds the full request text for one block.
pub fn build_request(block: &str) -> String {
    format!("{EXTRACTION_PROMPT}\n\nTexto del chat de WhatsApp:\n{block}")
}

/// Approximate token count of the request for `block` (four characters per token).
pub fn approx_request_tokens(block: &str) -> usize {
    block.chars().count() / 4 + EXTRACTION_PROMPT.chars().count() / 4
}

/// Markers of a transient capacity problem in a service error message.
const CAPACITY_MARKERS: [&str; 3] = ["429", "capacity", "service tier"];

/// Errors reported by an extraction service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The service is rate limited or over capacity. Worth retrying.
    #[error("service over capacity: {0}")]
    Capacity(String),

    /// The service answered with something that is not a recipe reply.
    #[error("malformed reply: {0}")]
    MalformedReply(String),

    /// Any other service failure.
    #[error("service error: {0}")]
    Service(String),

    /// The block does not fit the service's context window.
    #[error("block too large ({tokens} tokens, limit {limit})")]
    TooLarge {
        /// Estimated request size.
        tokens: usize,
        /// Allowed input size.
        limit: usize,
    },
}

impl ExtractError {
    /// Classifies a raw service error message.
    ///
    /// ```
    /// use recipack::extractor::ExtractError;
    ///
    /// assert!(ExtractError::classify("HTTP 429 Too Many Requests").is_transient());
    /// assert!(!ExtractError::classify("invalid api key").is_transient());
    /// ```
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if CAPACITY_MARKERS.iter().any(|m| lower.contains(m)) {
            ExtractError::Capacity(message)
        } else {
            ExtractError::Service(message)
        }
    }

    /// Returns `true` if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExtractError::Capacity(_))
    }
}

/// Recipes found in one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Extracted recipes, possibly empty.
    pub recipes: Vec<ExtractedRecipe>,
    /// Non-fatal note, e.g. that the local fallback produced the result.
    pub warning: Option<String>,
}

impl Extraction {
    /// An extraction with recipes and no warning.
    pub fn new(recipes: Vec<ExtractedRecipe>) -> Self {
        Self {
            recipes,
            warning: None,
        }
    }

    /// Builder-style method to attach a warning.
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

/// The extraction collaborator.
///
/// Takes one block of `[timestamp] author: text` lines and returns the recipes
/// in it. Implementations may be remote and slow; the pipeline calls them one
/// block at a time.
pub trait RecipeExtractor {
    /// Extracts recipes from `block`.
    fn extract(&mut self, block: &str) -> Result<Extraction, ExtractError>;
}

impl<T: RecipeExtractor + ?Sized> RecipeExtractor for Box<T> {
    fn extract(&mut self, block: &str) -> Result<Extraction, ExtractError> {
        (**self).extract(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_capacity_markers() {
        assert!(matches!(
            ExtractError::classify("Service tier capacity exceeded"),
            ExtractError::Capacity(_)
        ));
        assert!(matches!(
            ExtractError::classify("status 429"),
            ExtractError::Capacity(_)
        ));
        assert!(matches!(
            ExtractError::classify("connection reset"),
            ExtractError::Service(_)
        ));
    }

    #[test]
    fn test_only_capacity_is_transient() {
        assert!(ExtractError::Capacity("x".into()).is_transient());
        assert!(!ExtractError::MalformedReply("x".into()).is_transient());
        assert!(!ExtractError::TooLarge { tokens: 2, limit: 1 }.is_transient());
    }

    #[test]
    fn test_request_contains_block() {
        let request = build_request("[01/10/25 18:02:13] Ana: Flan");
        assert!(request.starts_with("Extrae recetas"));
        assert!(request.ends_with("Ana: Flan"));
    }

    #[test]
    fn test_token_estimate_includes_prompt() {
        let empty = approx_request_tokens("");
        assert!(empty > 0);
        assert_eq!(approx_request_tokens(&"x".repeat(400)), empty + 100);
    }
}
