//! Unified error types for recipack.
//!
//! [`RecipackError`] covers everything that can abort the processing of one
//! input file: unreadable files, unsupported formats, broken configuration and
//! failing collaborators. Recoverable conditions (an unparseable timestamp, a
//! block the extractor could not handle, a row that fails to save) are logged
//! and skipped instead of surfacing here.
//!
//! Errors from the semantic extraction service have their own type,
//! [`ExtractError`](crate::extractor::ExtractError), because the pipeline
//! reacts to them per block rather than per file.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized [`Result`] type for recipack operations.
///
/// # Example
///
/// ```rust
/// use recipack::error::Result;
/// use recipack::Message;
///
/// fn my_function() -> Result<Vec<Message>> {
///     Ok(vec![])
/// }
/// ```
pub type Result<T> = std::result::Result<T, RecipackError>;

/// The error type for all recipack operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecipackError {
    /// An I/O error occurred.
    ///
    /// This typically happens when:
    /// - The input file doesn't exist
    /// - Permission denied
    /// - The state directory cannot be created
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing/serialization error.
    ///
    /// Raised by the local recipe store, the checkpoint file and config loading.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading/writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The file extension is not one recipack knows how to read or write.
    #[error("Unsupported file format '{extension}' (file: {})", path.display())]
    UnsupportedFormat {
        /// The offending file
        path: PathBuf,
        /// The extension that was found (empty if none)
        extension: String,
    },

    /// Invalid date supplied by the caller.
    ///
    /// Checkpoints and `--since` values expect YYYY-MM-DD.
    #[error("Invalid date '{input}'. Expected format: {expected}")]
    InvalidDate {
        /// The invalid date string that was provided
        input: String,
        /// Expected format description
        expected: &'static str,
    },

    /// The configuration file is readable but semantically wrong.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong
        message: String,
    },

    /// The recipe or checkpoint store failed.
    #[error("Store error: {message}")]
    Store {
        /// Description of the failure
        message: String,
    },

    /// An Excel workbook could not be read.
    ///
    /// Covers broken zip containers, malformed XML parts and references to
    /// parts that are missing.
    #[error("Workbook error: {message}")]
    Workbook {
        /// Description of the failure
        message: String,
    },

    /// The image host could not accept an upload.
    #[error("Image host error: {message}")]
    ImageHost {
        /// Description of the failure
        message: String,
    },
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl RecipackError {
    /// Creates an unsupported-format error for `path`.
    pub fn unsupported_format(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        RecipackError::UnsupportedFormat { path, extension }
    }

    /// Creates an invalid date error.
    pub fn invalid_date(input: impl Into<String>) -> Self {
        RecipackError::InvalidDate {
            input: input.into(),
            expected: "YYYY-MM-DD",
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        RecipackError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a store error.
    pub fn store(message: impl Into<String>) -> Self {
        RecipackError::Store {
            message: message.into(),
        }
    }

    /// Creates an image host error.
    pub fn image_host(message: impl Into<String>) -> Self {
        RecipackError::ImageHost {
            message: message.into(),
        }
    }

    /// Creates a workbook error.
    pub fn workbook(message: impl Into<String>) -> Self {
        RecipackError::Workbook {
            message: message.into(),
        }
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, RecipackError::Io(_))
    }

    /// Returns `true` if this is an unsupported format error.
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, RecipackError::UnsupportedFormat { .. })
    }

    /// Returns `true` if this is an invalid date error.
    pub fn is_invalid_date(&self) -> bool {
        matches!(self, RecipackError::InvalidDate { .. })
    }

    /// Returns `true` if this is a store error.
    pub fn is_store(&self) -> bool {
        matches!(self, RecipackError::Store { .. })
    }

    /// Returns `true` if this is a workbook error.
    pub fn is_workbook(&self) -> bool {
        matches!(self, RecipackError::Workbook { .. })
    }
}

impl From<zip::result::ZipError> for RecipackError {
    fn from(err: zip::result::ZipError) -> Self {
        RecipackError::workbook(err.to_string())
    }
}

impl From<quick_xml::Error> for RecipackError {
    fn from(err: quick_xml::Error) -> Self {
        RecipackError::workbook(format!("malformed XML: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_captures_extension() {
        let err = RecipackError::unsupported_format("chat.pdf");
        assert!(err.is_unsupported_format());
        let msg = err.to_string();
        assert!(msg.contains("'pdf'"));
        assert!(msg.contains("chat.pdf"));
    }

    #[test]
    fn test_unsupported_format_without_extension() {
        let err = RecipackError::unsupported_format("README");
        match err {
            RecipackError::UnsupportedFormat { extension, .. } => assert!(extension.is_empty()),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_invalid_date_display() {
        let err = RecipackError::invalid_date("01-01-2024");
        assert!(err.is_invalid_date());
        assert_eq!(
            err.to_string(),
            "Invalid date '01-01-2024'. Expected format: YYYY-MM-DD"
        );
    }

    #[test]
    fn test_io_from() {
        let err: RecipackError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(err.is_io());
        assert!(!err.is_store());
    }

    #[test]
    fn test_zip_error_is_workbook_error() {
        let err: RecipackError = zip::result::ZipError::FileNotFound.into();
        assert!(err.is_workbook());
        assert!(err.to_string().starts_with("Workbook error:"));
    }

    #[test]
    fn test_store_and_image_host_messages() {
        assert_eq!(
            RecipackError::store("disk full").to_string(),
            "Store error: disk full"
        );
        assert_eq!(
            RecipackError::image_host("quota").to_string(),
            "Image host error: quota"
        );
        assert_eq!(
            RecipackError::invalid_config("bad").to_string(),
            "Invalid configuration: bad"
        );
    }
}
