//! JSON Lines (JSONL) output writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::models::StoredRecipe;
use crate::error::Result;

/// Writes recipes to JSONL, one compact object per line.
///
/// ```jsonl
/// {"id":1,"creator":"Ana","name":"Flan",...}
/// {"id":2,"creator":"Luis","name":"Gazpacho",...}
/// ```
pub fn write_jsonl(recipes: &[StoredRecipe], output_path: impl AsRef<Path>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    write_lines(recipes, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Converts recipes to a JSONL string.
pub fn to_jsonl(recipes: &[StoredRecipe]) -> Result<String> {
    let mut buffer = Vec::new();
    write_lines(recipes, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn write_lines<W: Write>(recipes: &[StoredRecipe], writer: &mut W) -> Result<()> {
    for recipe in recipes {
        serde_json::to_writer(&mut *writer, recipe)?;
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::RecipeRecord;
    use std::io::{BufRead, BufReader};
    use tempfile::NamedTempFile;

    #[test]
    fn test_write_jsonl_one_object_per_line() {
        let recipes = vec![
            StoredRecipe {
                id: 1,
                record: RecipeRecord::new("Ana", "Flan", "4 huevos"),
            },
            StoredRecipe {
                id: 2,
                record: RecipeRecord::new("Luis", "Sopa", "agua").with_steps("Hervir"),
            },
        ];

        let temp_file = NamedTempFile::new().unwrap();
        write_jsonl(&recipes, temp_file.path()).unwrap();

        let reader = BufReader::new(File::open(temp_file.path()).unwrap());
        let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);

        let second: StoredRecipe = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second, recipes[1]);
    }

    #[test]
    fn test_jsonl_no_array_brackets() {
        let jsonl = to_jsonl(&[StoredRecipe {
            id: 1,
            record: RecipeRecord::new("Ana", "Flan", "4 huevos"),
        }])
        .unwrap();
        assert!(!jsonl.starts_with('['));
        assert!(jsonl.ends_with('\n'));
    }
}
