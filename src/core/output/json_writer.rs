//! JSON output writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::models::StoredRecipe;
use crate::error::Result;

/// Writes recipes to a JSON file as a pretty-printed array.
///
/// The layout matches [`JsonFileStore`](crate::store::JsonFileStore), so an
/// export can be reopened as a store.
pub fn write_json(recipes: &[StoredRecipe], output_path: impl AsRef<Path>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, recipes)?;
    writer.flush()?;
    Ok(())
}

/// Converts recipes to a JSON array string.
pub fn to_json(recipes: &[StoredRecipe]) -> Result<String> {
    Ok(serde_json::to_string_pretty(recipes)?)
}
