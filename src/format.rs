//! Export format selection.
//!
//! Library-first: nothing here depends on the CLI.
//!
//! # Example
//!
//! ```rust
//! use recipack::format::OutputFormat;
//!
//! let format = OutputFormat::from_path("recetas.jsonl")?;
//! assert_eq!(format, OutputFormat::Jsonl);
//! # Ok::<(), recipack::RecipackError>(())
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::models::StoredRecipe;
use crate::core::output;
use crate::error::{RecipackError, Result};

/// Format for exported recipes.
///
/// # Example
///
/// ```rust
/// use recipack::format::OutputFormat;
/// use std::str::FromStr;
///
/// let format = OutputFormat::from_str("ndjson").unwrap();
/// assert_eq!(format, OutputFormat::Jsonl);
/// assert_eq!(format.extension(), "jsonl");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum OutputFormat {
    /// CSV with semicolon delimiter, for spreadsheets.
    #[default]
    Csv,

    /// JSON array, same layout as the store file.
    Json,

    /// JSON Lines, one recipe per line.
    Jsonl,
}

impl OutputFormat {
    /// Returns the file extension for this format (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
        }
    }

    /// Returns all supported format names.
    pub fn all_names() -> &'static [&'static str] {
        &["csv", "json", "jsonl", "ndjson"]
    }

    /// Detects the format from a file extension.
    ///
    /// # Errors
    ///
    /// [`RecipackError::UnsupportedFormat`] for anything but
    /// `csv`, `json`, `jsonl` or `ndjson`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            _ => Err(RecipackError::unsupported_format(path)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "CSV"),
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::Jsonl => write!(f, "JSONL"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            _ => Err(format!(
                "Unknown format: '{}'. Expected one of: {}",
                s,
                OutputFormat::all_names().join(", ")
            )),
        }
    }
}

/// Writes recipes to a file in the given format.
pub fn write_to_format(
    recipes: &[StoredRecipe],
    path: impl AsRef<Path>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Csv => output::write_csv(recipes, path),
        OutputFormat::Json => output::write_json(recipes, path),
        OutputFormat::Jsonl => output::write_jsonl(recipes, path),
    }
}

/// Converts recipes to a string in the given format.
pub fn to_format_string(recipes: &[StoredRecipe], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Csv => output::to_csv(recipes),
        OutputFormat::Json => output::to_json(recipes),
        OutputFormat::Jsonl => output::to_jsonl(recipes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::RecipeRecord;
    use std::str::FromStr;

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from_str("csv").unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("ndjson").unwrap(), OutputFormat::Jsonl);
        assert!(OutputFormat::from_str("xlsx").is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(OutputFormat::from_path("out.csv").unwrap(), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::from_path("/tmp/recetas.JSON").unwrap(),
            OutputFormat::Json
        );
        assert_eq!(
            OutputFormat::from_path("out.ndjson").unwrap(),
            OutputFormat::Jsonl
        );
        let err = OutputFormat::from_path("out.txt").unwrap_err();
        assert!(err.is_unsupported_format());
        assert!(OutputFormat::from_path("no_extension").is_err());
    }

    #[test]
    fn test_format_display_and_default() {
        assert_eq!(OutputFormat::Jsonl.to_string(), "JSONL");
        assert_eq!(OutputFormat::default(), OutputFormat::Csv);
        assert_eq!(serde_json::to_string(&OutputFormat::Json).unwrap(), "\"json\"");
    }

    #[test]
    fn test_to_format_string_dispatch() {
        let recipes = vec![StoredRecipe {
            id: 1,
            record: RecipeRecord::new("Ana", "Flan", "4 huevos"),
        }];
        assert!(to_format_string(&recipes, OutputFormat::Csv)
            .unwrap()
            .starts_with("id;"));
        assert!(to_format_string(&recipes, OutputFormat::Json)
            .unwrap()
            .starts_with('['));
        assert_eq!(
            to_format_string(&recipes, OutputFormat::Jsonl)
                .unwrap()
                .lines()
                .count(),
            1
        );
    }
}
