//! CSV output writer.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::core::models::StoredRecipe;
use crate::error::Result;

const HEADER: [&str; 8] = [
    "id",
    "creator",
    "name",
    "ingredients",
    "steps",
    "has_photo",
    "images",
    "message_date",
];

/// Writes recipes to CSV with semicolon delimiter.
///
/// # Format
/// - Delimiter: `;`
/// - Columns: `id`, `creator`, `name`, `ingredients`, `steps`, `has_photo`,
///   `images`, `message_date`
/// - Image URLs are joined with a single space
/// - Encoding: UTF-8
pub fn write_csv(recipes: &[StoredRecipe], output_path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(output_path)?;
    write_records(recipes, file)
}

/// Converts recipes to a CSV string, same format as [`write_csv`].
pub fn to_csv(recipes: &[StoredRecipe]) -> Result<String> {
    let mut buffer = Vec::new();
    write_records(recipes, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn write_records<W: Write>(recipes: &[StoredRecipe], sink: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(sink);
    writer.write_record(HEADER)?;
    for recipe in recipes {
        writer.write_record(build_record(recipe))?;
    }
    writer.flush()?;
    Ok(())
}

fn build_record(recipe: &StoredRecipe) -> [String; 8] {
    let record = &recipe.record;
    [
        recipe.id.to_string(),
        record.creator.clone(),
        record.name.clone(),
        record.ingredients.clone(),
        record.steps.clone().unwrap_or_default(),
        record.has_photo.to_string(),
        record
            .images
            .iter()
            .map(|i| i.url.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        record.message_date.clone().unwrap_or_default(),
    ]
}
