//! Local image host.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ImageHost;
use crate::error::{RecipackError, Result};

/// Writes uploaded images into a directory.
///
/// Files are named `<n>_<sanitized filename>` so repeated names never clash;
/// the returned URL is the file path.
#[derive(Debug, Clone)]
pub struct DirectoryImageHost {
    dir: PathBuf,
    uploaded: usize,
}

impl DirectoryImageHost {
    /// Uses `dir`, created on first upload.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            uploaded: 0,
        }
    }

    /// The target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn sanitize(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

impl ImageHost for DirectoryImageHost {
    fn upload(&mut self, bytes: &[u8], filename: &str) -> Result<String> {
        if bytes.is_empty() {
            return Err(RecipackError::image_host(format!("{filename}: empty image")));
        }
        fs::create_dir_all(&self.dir)?;
        self.uploaded += 1;
        let target = self
            .dir
            .join(format!("{}_{}", self.uploaded, sanitize(filename)));
        fs::write(&target, bytes)?;
        debug!(path = %target.display(), bytes = bytes.len(), "stored image");
        Ok(target.to_string_lossy().into_owned())
    }
}
