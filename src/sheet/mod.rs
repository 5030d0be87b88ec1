//! Spreadsheet input.
//!
//! A [`Sheet`] is a header row, data rows and any binary images anchored to
//! worksheet rows. Files on disk are read by extension:
//!
//! - `.xlsx` / `.xlsm`: every worksheet, in tab order, with embedded pictures
//! - `.csv` (commas) and `.tsv` (tabs): one sheet named after the file stem
//!
//! Library callers can also build sheets themselves and hand them to
//! [`SheetExtractor::extract_workbook`].
//!
//! # Example
//!
//! ```
//! use recipack::sheet::Sheet;
//!
//! let sheet = Sheet::new(
//!     "Hoja1",
//!     vec!["Nombre".into(), "Ingredientes".into()],
//!     vec![vec!["Flan".into(), "4 huevos".into()]],
//! );
//! assert_eq!(sheet.cell(0, 1), "4 huevos");
//! assert_eq!(sheet.cell(0, 9), "");
//! ```

mod extract;
mod workbook;

use std::path::Path;

use tracing::debug;

use crate::error::{RecipackError, Result};

pub use extract::{RowSkip, SheetExtractor};
pub use workbook::read_workbook;

/// A binary image embedded in a worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    /// Zero-based worksheet row of the image's top-left anchor (row 0 is the
    /// first header row).
    pub anchor_row: usize,
    /// Original file name, used to name the upload.
    pub filename: String,
    /// Image bytes.
    pub bytes: Vec<u8>,
}

impl EmbeddedImage {
    /// Creates an embedded image.
    pub fn new(anchor_row: usize, filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            anchor_row,
            filename: filename.into(),
            bytes,
        }
    }
}

/// One worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    /// Worksheet name.
    pub name: String,
    /// Header cells, trimmed.
    pub headers: Vec<String>,
    /// Data rows, cells trimmed. Rows may be ragged.
    pub rows: Vec<Vec<String>>,
    /// Embedded images.
    pub images: Vec<EmbeddedImage>,
}

impl Sheet {
    /// Creates a sheet without images. Cells are trimmed.
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let trim = |cells: Vec<String>| -> Vec<String> {
            cells.into_iter().map(|c| c.trim().to_string()).collect()
        };
        Self {
            name: name.into(),
            headers: trim(headers),
            rows: rows.into_iter().map(trim).collect(),
            images: Vec::new(),
        }
    }

    /// Builder-style method to embed an image.
    #[must_use]
    pub fn with_image(mut self, image: EmbeddedImage) -> Self {
        self.images.push(image);
        self
    }

    /// The cell at (`row`, `col`), or `""` outside the data.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }
}

/// Returns `true` for extensions [`load_sheets`] can read.
pub fn is_sheet_extension(extension: &str) -> bool {
    matches!(
        extension.to_ascii_lowercase().as_str(),
        "xlsx" | "xlsm" | "csv" | "tsv"
    )
}

/// Reads a spreadsheet file: a workbook or a delimited export.
///
/// # Errors
///
/// [`RecipackError::UnsupportedFormat`] for other extensions, plus I/O, CSV
/// and workbook errors.
pub fn load_sheets(path: &Path) -> Result<Vec<Sheet>> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let delimiter = match extension.as_str() {
        "xlsx" | "xlsm" => return workbook::load_workbook(path),
        "csv" => b',',
        "tsv" => b'\t',
        _ => return Err(RecipackError::unsupported_format(path)),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let mut records = records.into_iter();
    let headers = records.next().unwrap_or_default();
    let rows: Vec<Vec<String>> = records.collect();

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    debug!(sheet = %name, columns = headers.len(), rows = rows.len(), "loaded sheet");
    Ok(vec![Sheet::new(name, headers, rows)])
}
