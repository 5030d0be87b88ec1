//! Recipe export writers.
//!
//! - [`write_csv`] / [`to_csv`] - CSV with semicolon delimiter, one row per recipe
//! - [`write_json`] / [`to_json`] - pretty JSON array, the same shape as the store file
//! - [`write_jsonl`] / [`to_jsonl`] - one JSON object per line
//!
//! # Example
//!
//! ```rust
//! use recipack::core::models::{RecipeRecord, StoredRecipe};
//! use recipack::core::output::to_csv;
//!
//! let recipes = vec![StoredRecipe {
//!     id: 1,
//!     record: RecipeRecord::new("Ana", "Flan", "4 huevos"),
//! }];
//! let csv = to_csv(&recipes)?;
//! assert!(csv.starts_with("id;creator;name;ingredients"));
//! # Ok::<(), recipack::RecipackError>(())
//! ```

mod csv_writer;
mod json_writer;
mod jsonl_writer;

pub use csv_writer::{to_csv, write_csv};
pub use json_writer::{to_json, write_json};
pub use jsonl_writer::{to_jsonl, write_jsonl};
