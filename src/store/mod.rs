//! Persistence collaborators.
//!
//! The pipeline only talks to these traits:
//!
//! - [`RecipeStore`] - recipe records and the existing dedup keys
//! - [`CheckpointStore`] - the last processed date
//! - [`ImageHost`] - uploads of embedded spreadsheet images
//!
//! Local implementations are provided for each, so the CLI works without any
//! remote service: [`MemoryStore`], [`JsonFileStore`], [`LocalStateFile`],
//! [`MirroredCheckpoint`] and [`DirectoryImageHost`].

mod checkpoint;
mod images;
mod recipes;

use std::collections::HashSet;

use crate::core::models::{RecipeRecord, StoredRecipe};
use crate::core::normalize::DedupKey;
use crate::error::Result;

pub use checkpoint::{LocalStateFile, MemoryCheckpoint, MirroredCheckpoint, ProcessingState};
pub use images::DirectoryImageHost;
pub use recipes::{JsonFileStore, MemoryStore};

/// What [`RecipeStore::save`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new record was written with this id.
    Inserted(u64),
    /// An identical record already existed; nothing was written.
    Existing(u64),
}

impl SaveOutcome {
    /// The record id, new or existing.
    pub fn id(self) -> u64 {
        match self {
            SaveOutcome::Inserted(id) | SaveOutcome::Existing(id) => id,
        }
    }

    /// Returns `true` if a new record was written.
    pub fn is_inserted(self) -> bool {
        matches!(self, SaveOutcome::Inserted(_))
    }
}

/// Destination for recipe records.
pub trait RecipeStore {
    /// Saves `record`.
    ///
    /// Re-submitting a record with the same creator, name and ingredients
    /// returns [`SaveOutcome::Existing`] instead of failing.
    fn save(&mut self, record: RecipeRecord) -> Result<SaveOutcome>;

    /// Dedup keys of every stored record.
    fn existing_keys(&self) -> Result<HashSet<DedupKey>>;

    /// All stored records, in insertion order.
    fn list(&self) -> Result<Vec<StoredRecipe>>;
}

/// Storage for the processed-up-to date.
pub trait CheckpointStore {
    /// The stored `YYYY-MM-DD` checkpoint, if any.
    fn get_last_checkpoint(&self) -> Result<Option<String>>;

    /// Replaces the stored state. A `None` ISO date clears the checkpoint.
    fn set_last_checkpoint(&mut self, state: &ProcessingState) -> Result<()>;
}

/// Upload target for embedded images.
pub trait ImageHost {
    /// Stores `bytes` under a name derived from `filename`; returns its URL.
    fn upload(&mut self, bytes: &[u8], filename: &str) -> Result<String>;
}

impl<T: RecipeStore + ?Sized> RecipeStore for Box<T> {
    fn save(&mut self, record: RecipeRecord) -> Result<SaveOutcome> {
        (**self).save(record)
    }

    fn existing_keys(&self) -> Result<HashSet<DedupKey>> {
        (**self).existing_keys()
    }

    fn list(&self) -> Result<Vec<StoredRecipe>> {
        (**self).list()
    }
}

impl<T: CheckpointStore + ?Sized> CheckpointStore for Box<T> {
    fn get_last_checkpoint(&self) -> Result<Option<String>> {
        (**self).get_last_checkpoint()
    }

    fn set_last_checkpoint(&mut self, state: &ProcessingState) -> Result<()> {
        (**self).set_last_checkpoint(state)
    }
}
