//! Configuration types for the pipeline.
//!
//! This module provides plain configuration structs for library usage,
//! without any CLI framework dependencies. Every struct has sensible defaults
//! and `with_*` builder methods, and the whole tree can be loaded from a JSON
//! file with [`PipelineConfig::from_file`].
//!
//! - [`Vocabulary`] - word lists driving the recipe heuristics
//! - [`GrouperConfig`] - block size bound
//! - [`ExtractionConfig`] - pacing and retry policy for the extraction service
//! - [`SheetConfig`] - column vocabularies and aliases for spreadsheet rows
//!
//! # Example
//!
//! ```rust
//! use recipack::config::{PipelineConfig, ExtractionConfig};
//!
//! let config = PipelineConfig::new()
//!     .with_extraction(ExtractionConfig::new().with_min_interval_ms(0));
//! assert_eq!(config.grouper.max_continuations, 5);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RecipackError, Result};

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| (*w).to_string()).collect()
}

/// Word lists used by the recipe classifier.
///
/// All entries are matched case-insensitively. Defaults cover Spanish and
/// English chat groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Vocabulary {
    /// Phrases that mark a recipe outright (substring match), e.g. `"recipe:"`.
    pub indicator_phrases: Vec<String>,

    /// Bare words that mark a recipe outright (whole-word match).
    pub indicator_words: Vec<String>,

    /// Dish names that suggest a recipe title.
    pub dish_names: Vec<String>,

    /// Verbs and tools that suggest cooking instructions.
    pub cooking_verbs: Vec<String>,

    /// Units of measure recognized after a number.
    pub units: Vec<String>,

    /// Words that keep a block open once it has started.
    pub continuation_words: Vec<String>,

    /// Words that mark an unprefixed export line as part of a recipe.
    pub line_words: Vec<String>,

    /// Markers of WhatsApp system lines that are never recipe content.
    pub ignored_line_markers: Vec<String>,

    /// Messages with at most this many words count as "short" titles.
    pub short_message_words: usize,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            indicator_phrases: words(&[
                "receta:",
                "receta de",
                "ingredientes:",
                "recipe:",
                "recipe of",
                "recipe for",
                "ingredients:",
            ]),
            indicator_words: words(&["receta", "recipe"]),
            dish_names: words(&[
                "estofado", "flan", "torta", "salsa", "guiso", "sopa", "ensalada", "pasta",
                "arroz", "pescado", "carne", "pollo", "verduras", "costilla", "milagros",
                "teriyaki", "césar", "patatas", "gazpacho", "tortilla", "bizcocho", "stew",
                "cake", "soup", "salad", "sauce", "curry", "pie",
            ]),
            cooking_verbs: words(&[
                "hornear", "cocinar", "mezclar", "batir", "freír", "asar", "hervir", "15min",
                "olla", "bake", "cook", "mix", "whisk", "fry", "roast", "boil", "simmer",
            ]),
            units: words(&[
                "g", "gr", "grs", "kg", "mg", "ml", "cl", "dl", "l", "lt", "oz", "onz", "onza",
                "onzas", "taza", "tazas", "cucharada", "cucharadas", "cucharadita",
                "cucharaditas", "cuch", "cda", "cdas", "cdita", "pieza", "piezas", "unidad",
                "unidades", "ud", "uds", "pz", "cup", "cups", "tbsp", "tsp", "lb", "lbs",
            ]),
            continuation_words: words(&[
                "ingredientes",
                "pasos",
                "preparación",
                "receta",
                "mezclar",
                "hornear",
                "cocinar",
                "batir",
                "revolver",
                "ingredients",
                "steps",
                "method",
                "bake",
                "stir",
            ]),
            line_words: words(&[
                "hornear", "cocinar", "mezclar", "batir", "freír", "asar", "hervir", "min",
                "hora", "minutos", "pasos", "preparación", "olla", "sartén", "tomates",
                "cebolla", "ajo", "pimiento", "patatas", "carne", "pollo", "pescado", "arroz",
                "pasta", "salsa", "estofado", "guiso", "sopa", "steps", "bake", "oven",
            ]),
            ignored_line_markers: words(&[
                "multimedia omitido",
                "media omitted",
                "cifrado",
                "extremo a extremo",
                "end-to-end encrypted",
            ]),
            short_message_words: 3,
        }
    }
}

impl Vocabulary {
    /// Creates the default vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the dish-name list.
    #[must_use]
    pub fn with_dish_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dish_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the unit list.
    #[must_use]
    pub fn with_units<I, S>(mut self, units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.units = units.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the cooking-verb list.
    #[must_use]
    pub fn with_cooking_verbs<I, S>(mut self, verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cooking_verbs = verbs.into_iter().map(Into::into).collect();
        self
    }
}

/// Configuration for the block grouper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrouperConfig {
    /// Maximum continuation messages absorbed after a seed (default: 5).
    pub max_continuations: usize,
}

impl Default for GrouperConfig {
    fn default() -> Self {
        Self {
            max_continuations: 5,
        }
    }
}

impl GrouperConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the continuation bound.
    #[must_use]
    pub fn with_max_continuations(mut self, n: usize) -> Self {
        self.max_continuations = n;
        self
    }
}

/// Pacing and retry policy for the extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Minimum time between two calls, in milliseconds (default: 1500).
    pub min_interval_ms: u64,

    /// Attempts per block before falling back (default: 3).
    pub max_attempts: u32,

    /// Base retry delay in milliseconds, multiplied by the attempt number (default: 2000).
    pub retry_delay_ms: u64,

    /// Context window of the service, in tokens (default: 32000).
    pub context_window_tokens: usize,

    /// Tokens reserved for the reply (default: 2000).
    pub max_output_tokens: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1500,
            max_attempts: 3,
            retry_delay_ms: 2000,
            context_window_tokens: 32_000,
            max_output_tokens: 2_000,
        }
    }
}

impl ExtractionConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum inter-call interval.
    #[must_use]
    pub fn with_min_interval_ms(mut self, ms: u64) -> Self {
        self.min_interval_ms = ms;
        self
    }

    /// Sets the attempt cap.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base retry delay.
    #[must_use]
    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    /// Minimum interval as a [`Duration`].
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(u64::from(attempt)))
    }

    /// Token budget left for the prompt and the block.
    pub fn input_token_limit(&self) -> usize {
        self.context_window_tokens
            .saturating_sub(self.max_output_tokens)
    }
}

/// Collapses spelling variants of one creator into a canonical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorAlias {
    /// Name written to the store.
    pub canonical: String,
    /// Variants, compared case- and accent-insensitively.
    pub variants: Vec<String>,
}

impl CreatorAlias {
    /// Creates an alias entry.
    pub fn new<I, S>(canonical: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            canonical: canonical.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }
}

/// Column vocabularies and policies for spreadsheet rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetConfig {
    /// Rows whose first cell contains one of these words are header rows.
    pub header_words: Vec<String>,

    /// Header fragments identifying the creator column.
    pub creator_headers: Vec<String>,

    /// Header fragments identifying ingredient columns.
    pub ingredient_headers: Vec<String>,

    /// Header fragments identifying preparation columns.
    pub step_headers: Vec<String>,

    /// Header fragments identifying image columns.
    pub image_headers: Vec<String>,

    /// Creator used when neither a creator column nor a sheet name is available.
    pub fallback_creator: String,

    /// Creator alias table.
    pub creator_aliases: Vec<CreatorAlias>,

    /// Header rows above the data; used to map image anchors to data rows.
    pub header_rows: usize,

    /// First column scanned for steps when no preparation header exists.
    pub step_scan_first: usize,

    /// Last column scanned for steps when no preparation header exists.
    pub step_scan_last: usize,

    /// A cell with more quantity matches than this reads as an ingredient list.
    pub ingredient_density_threshold: usize,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            header_words: words(&[
                "ingredientes",
                "ingredients",
                "preparación",
                "preparacion",
                "preparation",
                "pasos",
                "steps",
                "método",
                "metodo",
                "method",
                "receta",
                "recipe",
                "instrucciones",
                "instructions",
            ]),
            creator_headers: words(&["author", "autor", "creator", "creador"]),
            ingredient_headers: words(&["ingredient"]),
            step_headers: words(&[
                "preparación",
                "preparacion",
                "preparation",
                "pasos",
                "steps",
                "método",
                "metodo",
                "method",
                "instrucciones",
                "instructions",
                "elaboración",
                "elaboracion",
            ]),
            image_headers: words(&["image", "imagen", "photo", "foto", "url"]),
            fallback_creator: "Excel Import".to_string(),
            creator_aliases: vec![CreatorAlias::new(
                "Excel Import",
                ["Sheet1", "Hoja1", "Hoja 1", "Feuil1", "Tabelle1", "excel_import"],
            )],
            header_rows: 1,
            step_scan_first: 2,
            step_scan_last: 4,
            ingredient_density_threshold: 2,
        }
    }
}

impl SheetConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a creator alias.
    #[must_use]
    pub fn with_alias(mut self, alias: CreatorAlias) -> Self {
        self.creator_aliases.push(alias);
        self
    }

    /// Sets the fallback creator.
    #[must_use]
    pub fn with_fallback_creator(mut self, name: impl Into<String>) -> Self {
        self.fallback_creator = name.into();
        self
    }
}

/// Top-level configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Classifier word lists.
    pub vocabulary: Vocabulary,

    /// Block grouping bound.
    pub grouper: GrouperConfig,

    /// Extraction pacing and retries.
    pub extraction: ExtractionConfig,

    /// Spreadsheet column handling.
    pub sheet: SheetConfig,

    /// Directory holding `last_processed.json` (default: `state`).
    pub state_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vocabulary: Vocabulary::default(),
            grouper: GrouperConfig::default(),
            extraction: ExtractionConfig::default(),
            sheet: SheetConfig::default(),
            state_dir: PathBuf::from("state"),
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file. Missing sections keep defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that cannot produce a working pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.vocabulary.units.iter().all(|u| u.trim().is_empty()) {
            return Err(RecipackError::invalid_config(
                "vocabulary.units must contain at least one unit",
            ));
        }
        if self.extraction.max_attempts == 0 {
            return Err(RecipackError::invalid_config(
                "extraction.max_attempts must be at least 1",
            ));
        }
        if self.sheet.step_scan_first > self.sheet.step_scan_last {
            return Err(RecipackError::invalid_config(
                "sheet.step_scan_first must not exceed sheet.step_scan_last",
            ));
        }
        Ok(())
    }

    /// Sets the vocabulary.
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Sets the grouper configuration.
    #[must_use]
    pub fn with_grouper(mut self, grouper: GrouperConfig) -> Self {
        self.grouper = grouper;
        self
    }

    /// Sets the extraction configuration.
    #[must_use]
    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    /// Sets the sheet configuration.
    #[must_use]
    pub fn with_sheet(mut self, sheet: SheetConfig) -> Self {
        self.sheet = sheet;
        self
    }

    /// Sets the state directory.
    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }
}
