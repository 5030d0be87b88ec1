//! Checkpoint persistence.
//!
//! The local state file keeps the Spanish field names of the legacy state layout:
//!
//! ```json
//! {
//!   "ultima_fecha_procesada": "03/10/25 21:14:09",
//!   "ultima_fecha_iso": "2025-10-03",
//!   "ultima_actualizacion": "2025-10-04T08:00:00.000000"
//! }
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::CheckpointStore;
use crate::error::Result;
use crate::parsing::whatsapp::to_iso_date;

/// File name of the local state file inside the state directory.
pub const STATE_FILE_NAME: &str = "last_processed.json";

/// What a run records about where it stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingState {
    /// Raw timestamp of the last message seen.
    #[serde(rename = "ultima_fecha_procesada", default)]
    pub last_timestamp: Option<String>,

    /// The same instant as a `YYYY-MM-DD` checkpoint.
    #[serde(rename = "ultima_fecha_iso", default)]
    pub last_date_iso: Option<String>,

    /// When the state was written.
    #[serde(rename = "ultima_actualizacion", default)]
    pub updated_at: String,
}

impl ProcessingState {
    /// Builds the state for a run whose last message had `timestamp`.
    pub fn from_last_timestamp(timestamp: Option<&str>) -> Self {
        Self {
            last_timestamp: timestamp.map(str::to_string),
            last_date_iso: timestamp.and_then(to_iso_date),
            updated_at: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        }
    }

    /// The checkpoint this state stands for.
    ///
    /// Prefers the ISO field and converts the raw timestamp of older state
    /// files that lack it.
    pub fn checkpoint(&self) -> Option<String> {
        self.last_date_iso
            .clone()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| self.last_timestamp.as_deref().and_then(to_iso_date))
    }
}

/// Checkpoint kept in `state_dir/last_processed.json`.
#[derive(Debug, Clone)]
pub struct LocalStateFile {
    path: PathBuf,
}

impl LocalStateFile {
    /// Uses `state_dir/last_processed.json`.
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(STATE_FILE_NAME),
        }
    }

    /// The state file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the full state, if the file exists and parses.
    pub fn read_state(&self) -> Result<Option<ProcessingState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&content) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring unreadable state file");
                Ok(None)
            }
        }
    }
}

impl CheckpointStore for LocalStateFile {
    fn get_last_checkpoint(&self) -> Result<Option<String>> {
        Ok(self.read_state()?.and_then(|s| s.checkpoint()))
    }

    fn set_last_checkpoint(&mut self, state: &ProcessingState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(state)?)?;
        debug!(
            path = %self.path.display(),
            checkpoint = state.last_date_iso.as_deref().unwrap_or("none"),
            "wrote state file"
        );
        Ok(())
    }
}

/// In-memory checkpoint, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpoint {
    state: Option<ProcessingState>,
}

impl MemoryCheckpoint {
    /// Starts without a checkpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts at `date` (`YYYY-MM-DD`).
    pub fn at(date: impl Into<String>) -> Self {
        Self {
            state: Some(ProcessingState {
                last_timestamp: None,
                last_date_iso: Some(date.into()),
                updated_at: String::new(),
            }),
        }
    }

    /// The last written state.
    pub fn state(&self) -> Option<&ProcessingState> {
        self.state.as_ref()
    }
}

impl CheckpointStore for MemoryCheckpoint {
    fn get_last_checkpoint(&self) -> Result<Option<String>> {
        Ok(self.state.as_ref().and_then(ProcessingState::checkpoint))
    }

    fn set_last_checkpoint(&mut self, state: &ProcessingState) -> Result<()> {
        self.state = Some(state.clone());
        Ok(())
    }
}

/// A primary checkpoint store mirrored to a local state file.
///
/// Reads prefer the primary and fall back to the file when the primary fails
/// or has nothing. Writes go to both; only a failing file write is an error.
#[derive(Debug)]
pub struct MirroredCheckpoint<P> {
    primary: P,
    mirror: LocalStateFile,
}

impl<P: CheckpointStore> MirroredCheckpoint<P> {
    /// Mirrors `primary` into `mirror`.
    pub fn new(primary: P, mirror: LocalStateFile) -> Self {
        Self { primary, mirror }
    }

    /// The primary store.
    pub fn primary(&self) -> &P {
        &self.primary
    }
}

impl<P: CheckpointStore> CheckpointStore for MirroredCheckpoint<P> {
    fn get_last_checkpoint(&self) -> Result<Option<String>> {
        match self.primary.get_last_checkpoint() {
            Ok(Some(date)) => return Ok(Some(date)),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "primary checkpoint store unavailable, using local state"),
        }
        self.mirror.get_last_checkpoint()
    }

    fn set_last_checkpoint(&mut self, state: &ProcessingState) -> Result<()> {
        if let Err(err) = self.primary.set_last_checkpoint(state) {
            warn!(error = %err, "could not write primary checkpoint");
        }
        self.mirror.set_last_checkpoint(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecipackError;
    use tempfile::tempdir;

    struct Unavailable;

    impl CheckpointStore for Unavailable {
        fn get_last_checkpoint(&self) -> Result<Option<String>> {
            Err(RecipackError::store("offline"))
        }

        fn set_last_checkpoint(&mut self, _state: &ProcessingState) -> Result<()> {
            Err(RecipackError::store("offline"))
        }
    }

    #[test]
    fn test_state_from_timestamp() {
        let state = ProcessingState::from_last_timestamp(Some("03/10/25 21:14:09"));
        assert_eq!(state.last_date_iso.as_deref(), Some("2025-10-03"));
        assert_eq!(state.checkpoint().as_deref(), Some("2025-10-03"));

        let cleared = ProcessingState::from_last_timestamp(Some("garbage"));
        assert_eq!(cleared.last_date_iso, None);
        assert_eq!(cleared.checkpoint(), None);
    }

    #[test]
    fn test_state_file_field_names() {
        let state = ProcessingState::from_last_timestamp(Some("03/10/25 21:14:09"));
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["ultima_fecha_procesada"], "03/10/25 21:14:09");
        assert_eq!(value["ultima_fecha_iso"], "2025-10-03");
        assert!(value["ultima_actualizacion"].is_string());
    }

    #[test]
    fn test_local_file_roundtrip() {
        let dir = tempdir().unwrap();
        let mut store = LocalStateFile::new(dir.path().join("state"));
        assert_eq!(store.get_last_checkpoint().unwrap(), None);

        store
            .set_last_checkpoint(&ProcessingState::from_last_timestamp(Some("05/10/25 10:00:00")))
            .unwrap();
        assert!(store.path().exists());
        assert_eq!(
            store.get_last_checkpoint().unwrap().as_deref(),
            Some("2025-10-05")
        );
    }

    #[test]
    fn test_legacy_state_converted() {
        let dir = tempdir().unwrap();
        let store = LocalStateFile::new(dir.path());
        fs::write(
            store.path(),
            r#"{"ultima_fecha_procesada": "01/09/25 08:00:00", "ultima_fecha_iso": null}"#,
        )
        .unwrap();
        assert_eq!(
            store.get_last_checkpoint().unwrap().as_deref(),
            Some("2025-09-01")
        );
    }

    #[test]
    fn test_corrupt_state_ignored() {
        let dir = tempdir().unwrap();
        let store = LocalStateFile::new(dir.path());
        fs::write(store.path(), "{ nope").unwrap();
        assert_eq!(store.get_last_checkpoint().unwrap(), None);
    }

    #[test]
    fn test_mirror_used_when_primary_fails() {
        let dir = tempdir().unwrap();
        let mut mirror = LocalStateFile::new(dir.path());
        mirror
            .set_last_checkpoint(&ProcessingState::from_last_timestamp(Some("02/10/25 10:00:00")))
            .unwrap();

        let mut store = MirroredCheckpoint::new(Unavailable, mirror);
        assert_eq!(
            store.get_last_checkpoint().unwrap().as_deref(),
            Some("2025-10-02")
        );
        store
            .set_last_checkpoint(&ProcessingState::from_last_timestamp(Some("04/10/25 10:00:00")))
            .unwrap();
        assert_eq!(
            store.get_last_checkpoint().unwrap().as_deref(),
            Some("2025-10-04")
        );
    }

    #[test]
    fn test_primary_preferred() {
        let dir = tempdir().unwrap();
        let mut mirror = LocalStateFile::new(dir.path());
        mirror
            .set_last_checkpoint(&ProcessingState::from_last_timestamp(Some("02/10/25 10:00:00")))
            .unwrap();
        let store = MirroredCheckpoint::new(MemoryCheckpoint::at("2025-10-09"), mirror);
        assert_eq!(
            store.get_last_checkpoint().unwrap().as_deref(),
            Some("2025-10-09")
        );
    }
}
