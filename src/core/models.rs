//! Recipe records and processing statistics.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::normalize::DedupKey;

/// An image attached to a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Public URL, or the image host's location for uploaded bytes.
    pub url: String,
    /// Creator the image belongs to.
    pub author: String,
    /// Spreadsheet row that produced the image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_row: Option<usize>,
}

impl ImageRef {
    /// Creates an image reference not tied to a row.
    pub fn new(url: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            author: author.into(),
            source_row: None,
        }
    }

    /// Builder-style method to set the source row.
    #[must_use]
    pub fn with_row(mut self, row: usize) -> Self {
        self.source_row = Some(row);
        self
    }
}

/// A recipe as handed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRecord {
    /// Who shared the recipe.
    pub creator: String,
    /// Recipe name.
    pub name: String,
    /// Ingredient list, free text. Never empty for stored records.
    pub ingredients: String,
    /// Preparation steps, if known.
    pub steps: Option<String>,
    /// Whether the source mentions or carries a photo.
    pub has_photo: bool,
    /// Attached images.
    #[serde(default)]
    pub images: Vec<ImageRef>,
    /// ISO date-time of the source message (chat input only).
    pub message_date: Option<String>,
}

impl RecipeRecord {
    /// Creates a record with no steps, photos or date.
    pub fn new(
        creator: impl Into<String>,
        name: impl Into<String>,
        ingredients: impl Into<String>,
    ) -> Self {
        Self {
            creator: creator.into(),
            name: name.into(),
            ingredients: ingredients.into(),
            steps: None,
            has_photo: false,
            images: Vec::new(),
            message_date: None,
        }
    }

    /// Builder-style method to set the steps.
    #[must_use]
    pub fn with_steps(mut self, steps: impl Into<String>) -> Self {
        self.steps = Some(steps.into());
        self
    }

    /// Builder-style method to set the message date.
    #[must_use]
    pub fn with_message_date(mut self, date: impl Into<String>) -> Self {
        self.message_date = Some(date.into());
        self
    }

    /// Builder-style method to attach images. Sets `has_photo` when non-empty.
    #[must_use]
    pub fn with_images(mut self, images: Vec<ImageRef>) -> Self {
        self.has_photo |= !images.is_empty();
        self.images = images;
        self
    }

    /// Normalized `(creator, name)` key.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.creator, &self.name)
    }

    /// Returns `true` if `other` has the same creator, name and ingredients.
    pub fn same_recipe(&self, other: &RecipeRecord) -> bool {
        self.dedup_key() == other.dedup_key() && self.ingredients.trim() == other.ingredients.trim()
    }
}

/// A record with its store identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecipe {
    /// Store-assigned identifier.
    pub id: u64,
    /// The record itself.
    #[serde(flatten)]
    pub record: RecipeRecord,
}

/// A recipe assembled from one spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeCandidate {
    /// Resolved creator.
    pub creator: String,
    /// Recipe name from column 0.
    pub name: String,
    /// Extracted ingredients, non-empty.
    pub ingredients: String,
    /// Extracted steps.
    pub steps: Option<String>,
    /// Linked and uploaded images.
    pub images: Vec<ImageRef>,
    /// Zero-based data row index.
    pub row_index: usize,
}

impl RecipeCandidate {
    /// Converts into a store record.
    pub fn into_record(self) -> RecipeRecord {
        let mut record = RecipeRecord::new(self.creator, self.name, self.ingredients)
            .with_images(self.images);
        record.steps = self.steps;
        record
    }
}

/// A recipe as returned by the extraction service.
///
/// Field names follow the English schema; the Spanish names some services
/// reply with are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecipe {
    /// Who shared the recipe.
    #[serde(default, alias = "creador")]
    pub creator: String,
    /// Recipe name, if the service found one.
    #[serde(default, alias = "nombre_receta", alias = "nombre")]
    pub name: Option<String>,
    /// Ingredient list.
    #[serde(default, alias = "ingredientes")]
    pub ingredients: String,
    /// Preparation steps.
    #[serde(default, alias = "pasos_preparacion", alias = "pasos")]
    pub steps: Option<String>,
    /// Whether a photo is mentioned.
    #[serde(default, alias = "tiene_foto")]
    pub has_photo: bool,
    /// ISO date-time of the source message.
    #[serde(default, alias = "fecha_mensaje")]
    pub message_date: Option<String>,
}

impl ExtractedRecipe {
    /// Returns `true` if the recipe carries ingredients.
    pub fn has_ingredients(&self) -> bool {
        !self.ingredients.trim().is_empty()
    }

    /// Converts into a store record; `fallback_creator` fills a blank creator.
    pub fn into_record(self, fallback_creator: &str) -> RecipeRecord {
        let creator = if self.creator.trim().is_empty() {
            fallback_creator.to_string()
        } else {
            self.creator.trim().to_string()
        };
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Sin nombre".to_string());

        RecipeRecord {
            creator,
            name,
            ingredients: self.ingredients.trim().to_string(),
            steps: self
                .steps
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            has_photo: self.has_photo,
            images: Vec::new(),
            message_date: self.message_date,
        }
    }
}

/// Counts for one chat export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatStats {
    /// Messages left after checkpoint filtering.
    pub messages_processed: usize,
    /// Blocks handed to the extractor.
    pub blocks_processed: usize,
    /// Recipes the extractor returned.
    pub recipes_extracted: usize,
    /// Recipes newly written to the store.
    pub recipes_inserted: usize,
    /// Blocks whose extraction failed outright.
    pub failed_blocks: usize,
}

/// Counts for one spreadsheet file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetStats {
    /// Rows assembled into complete candidates.
    pub extracted: usize,
    /// Candidates newly written to the store.
    pub inserted: usize,
}

impl SheetStats {
    /// Adds another sheet's counts.
    pub fn absorb(&mut self, other: SheetStats) {
        self.extracted += other.extracted;
        self.inserted += other.inserted;
    }
}

/// Per-path statistics, by input kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessStats {
    /// Chat export.
    Chat(ChatStats),
    /// Spreadsheet.
    Sheet(SheetStats),
}

impl ProcessStats {
    /// Recipes written to the store.
    pub fn inserted(&self) -> usize {
        match self {
            ProcessStats::Chat(s) => s.recipes_inserted,
            ProcessStats::Sheet(s) => s.inserted,
        }
    }

    /// Recipes found, before deduplication.
    pub fn extracted(&self) -> usize {
        match self {
            ProcessStats::Chat(s) => s.recipes_extracted,
            ProcessStats::Sheet(s) => s.extracted,
        }
    }
}

/// Outcome of processing one file.
///
/// Always produced, even on failure: zero counts mean "nothing found", an
/// `error` means "could not process".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessReport {
    /// The input file.
    pub file: PathBuf,
    /// Counts, absent when the file failed.
    pub stats: Option<ProcessStats>,
    /// File-level error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessReport {
    /// A successful report.
    pub fn ok(file: &Path, stats: ProcessStats) -> Self {
        Self {
            file: file.to_path_buf(),
            stats: Some(stats),
            error: None,
        }
    }

    /// A failed report.
    pub fn failed(file: &Path, error: impl ToString) -> Self {
        Self {
            file: file.to_path_buf(),
            stats: None,
            error: Some(error.to_string()),
        }
    }

    /// Returns `true` if the file could not be processed.
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_images_sets_photo_flag() {
        let record = RecipeRecord::new("Ana", "Flan", "huevos")
            .with_images(vec![ImageRef::new("https://x/flan.jpg", "Ana")]);
        assert!(record.has_photo);

        let bare = RecipeRecord::new("Ana", "Flan", "huevos").with_images(Vec::new());
        assert!(!bare.has_photo);
    }

    #[test]
    fn test_same_recipe_ignores_case_and_accents() {
        let a = RecipeRecord::new("José", "Flan", "4 huevos");
        let b = RecipeRecord::new("jose", "FLAN ", "4 huevos\n");
        let c = RecipeRecord::new("jose", "flan", "6 huevos");
        assert!(a.same_recipe(&b));
        assert!(!a.same_recipe(&c));
    }

    #[test]
    fn test_extracted_recipe_spanish_aliases() {
        let json = r#"{
            "creador": "Ana",
            "nombre_receta": "Gazpacho",
            "ingredientes": "1kg tomates",
            "pasos_preparacion": "Triturar",
            "tiene_foto": true,
            "fecha_mensaje": "2025-10-01T18:02:13+00:00"
        }"#;
        let recipe: ExtractedRecipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.creator, "Ana");
        assert_eq!(recipe.name.as_deref(), Some("Gazpacho"));
        assert!(recipe.has_photo);
        assert!(recipe.has_ingredients());
    }

    #[test]
    fn test_extracted_into_record_defaults() {
        let recipe = ExtractedRecipe {
            ingredients: " harina ".into(),
            steps: Some("  ".into()),
            ..Default::default()
        };
        let record = recipe.into_record("Ana");
        assert_eq!(record.creator, "Ana");
        assert_eq!(record.name, "Sin nombre");
        assert_eq!(record.ingredients, "harina");
        assert_eq!(record.steps, None);
    }

    #[test]
    fn test_candidate_into_record() {
        let candidate = RecipeCandidate {
            creator: "Ana".into(),
            name: "Gazpacho".into(),
            ingredients: "1kg tomates".into(),
            steps: Some("Triturar".into()),
            images: vec![ImageRef::new("https://x/g.jpg", "Ana").with_row(0)],
            row_index: 0,
        };
        let record = candidate.into_record();
        assert!(record.has_photo);
        assert_eq!(record.steps.as_deref(), Some("Triturar"));
        assert_eq!(record.message_date, None);
    }

    #[test]
    fn test_stored_recipe_flattens() {
        let stored = StoredRecipe {
            id: 7,
            record: RecipeRecord::new("Ana", "Flan", "huevos"),
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["creator"], "Ana");
    }

    #[test]
    fn test_report_serialization() {
        let report = ProcessReport::ok(
            Path::new("chat.txt"),
            ProcessStats::Chat(ChatStats {
                recipes_extracted: 1,
                ..Default::default()
            }),
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["stats"]["kind"], "chat");
        assert_eq!(value["stats"]["recipes_extracted"], 1);
        assert!(value.get("error").is_none());

        let failed = ProcessReport::failed(Path::new("x.pdf"), "unsupported");
        assert!(failed.is_failure());
    }
}
