//! Recipe stores.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{RecipeStore, SaveOutcome};
use crate::core::models::{RecipeRecord, StoredRecipe};
use crate::core::normalize::DedupKey;
use crate::error::Result;

/// In-memory store, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<StoredRecipe>,
    next_id: u64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `records`.
    pub fn with_records(records: Vec<StoredRecipe>) -> Self {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0);
        Self { records, next_id }
    }

    /// Stored records.
    pub fn records(&self) -> &[StoredRecipe] {
        &self.records
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn find_same(&self, record: &RecipeRecord) -> Option<u64> {
        self.records
            .iter()
            .find(|stored| stored.record.same_recipe(record))
            .map(|stored| stored.id)
    }

    /// Drops the record inserted last, if it has `id`.
    fn forget_last(&mut self, id: u64) {
        if self.records.last().is_some_and(|r| r.id == id) {
            self.records.pop();
            self.next_id -= 1;
        }
    }
}

impl RecipeStore for MemoryStore {
    fn save(&mut self, record: RecipeRecord) -> Result<SaveOutcome> {
        if let Some(id) = self.find_same(&record) {
            return Ok(SaveOutcome::Existing(id));
        }
        self.next_id += 1;
        let id = self.next_id;
        self.records.push(StoredRecipe { id, record });
        Ok(SaveOutcome::Inserted(id))
    }

    fn existing_keys(&self) -> Result<HashSet<DedupKey>> {
        Ok(self.records.iter().map(|r| r.record.dedup_key()).collect())
    }

    fn list(&self) -> Result<Vec<StoredRecipe>> {
        Ok(self.records.clone())
    }
}

/// Store backed by a pretty-printed JSON array on disk.
///
/// The file is read once on open and rewritten after every insert, so an
/// interrupted run keeps everything saved so far.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Opens `path`, starting empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records: Vec<StoredRecipe> = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), records = records.len(), "opened recipe store");
        Ok(Self {
            path,
            inner: MemoryStore::with_records(records),
        })
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(writer, self.inner.records())?;
        Ok(())
    }
}

impl RecipeStore for JsonFileStore {
    fn save(&mut self, record: RecipeRecord) -> Result<SaveOutcome> {
        let outcome = self.inner.save(record)?;
        if let SaveOutcome::Inserted(id) = outcome {
            if let Err(err) = self.flush() {
                self.inner.forget_last(id);
                return Err(err);
            }
        }
        Ok(outcome)
    }

    fn existing_keys(&self) -> Result<HashSet<DedupKey>> {
        self.inner.existing_keys()
    }

    fn list(&self) -> Result<Vec<StoredRecipe>> {
        self.inner.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn flan() -> RecipeRecord {
        RecipeRecord::new("Ana", "Flan", "4 huevos, 1 l leche")
    }

    #[test]
    fn test_identical_resubmission_returns_existing() {
        let mut store = MemoryStore::new();
        let first = store.save(flan()).unwrap();
        let second = store.save(RecipeRecord::new("ANA", "flán", "4 huevos, 1 l leche")).unwrap();

        assert_eq!(first, SaveOutcome::Inserted(1));
        assert_eq!(second, SaveOutcome::Existing(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_different_ingredients_inserted() {
        let mut store = MemoryStore::new();
        store.save(flan()).unwrap();
        let outcome = store.save(RecipeRecord::new("Ana", "Flan", "6 huevos")).unwrap();
        assert_eq!(outcome, SaveOutcome::Inserted(2));
    }

    #[test]
    fn test_existing_keys_normalized() {
        let mut store = MemoryStore::new();
        store.save(RecipeRecord::new("José", "Piña colada", "piña")).unwrap();
        let keys = store.existing_keys().unwrap();
        assert!(keys.contains(&DedupKey::new("jose", "pina colada")));
    }

    #[test]
    fn test_json_store_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("recipes.json");

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.save(flan()).unwrap();
            store.save(RecipeRecord::new("Luis", "Sopa", "agua")).unwrap();
        }

        let mut reopened = JsonFileStore::open(&path).unwrap();
        let records = reopened.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, 2);
        assert_eq!(reopened.save(flan()).unwrap(), SaveOutcome::Existing(1));
        assert_eq!(reopened.save(RecipeRecord::new("Marta", "Gazpacho", "tomate")).unwrap(), SaveOutcome::Inserted(3));
    }

    #[test]
    fn test_failed_write_is_not_remembered() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "a file, not a directory").unwrap();

        let mut store = JsonFileStore::open(blocker.join("recipes.json")).unwrap();
        assert!(store.save(flan()).is_err());
        assert!(store.save(flan()).is_err());
        assert!(store.list().unwrap().is_empty());
        assert!(store.existing_keys().unwrap().is_empty());
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recipes.json");
        fs::write(&path, "not json").unwrap();
        assert!(JsonFileStore::open(&path).is_err());
    }
}
