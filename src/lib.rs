//! # Recipack
//!
//! Find recipes buried in WhatsApp chat exports and spreadsheet dumps, and
//! turn them into structured records.
//!
//! ## Overview
//!
//! Recipes shared in group chats are rarely written as recipes: a dish name,
//! a handful of quantity lines, a follow-up message with the steps. Recipack
//! reads the export, keeps the lines that look like recipe text, groups them
//! into per-author blocks and hands each block to an extraction service. The
//! results are deduplicated by `(creator, name)` and stored. Spreadsheets
//! take a parallel path where every row is a candidate and columns are
//! recognised by their headers.
//!
//! Runs are incremental: a checkpoint date records how far the last run got.
//!
//! ## Quick Start
//!
//! ```rust
//! use recipack::prelude::*;
//!
//! let config = PipelineConfig::default();
//! let mut pipeline = Pipeline::new(
//!     config,
//!     RegexFallback::new(),
//!     MemoryStore::new(),
//!     MemoryCheckpoint::new(),
//! );
//!
//! let stats = pipeline.process_chat_str(
//!     "[01/10/25, 18:02:13] Ana: Receta de bizcocho\n- 200g harina\n- 3 huevos\nPasos:\n1. Mezclar\n2. Hornear 30 min",
//!     None,
//! );
//! assert_eq!(stats.blocks_processed, 1);
//! assert_eq!(stats.recipes_inserted, 1);
//! ```
//!
//! ## Module Structure
//!
//! - [`parsers`] - [`ChatParser`](parsers::ChatParser), the WhatsApp line parser
//! - [`parsing`] - timestamp formats and date helpers
//! - [`core`] - classifier, grouper, checkpoint filter, models, pipeline, export writers
//! - [`sheet`] - workbook (xlsx) and CSV/TSV loading, row extraction
//! - [`extractor`] - extraction service trait, reply parsing, retries, local fallback
//! - [`store`] - recipe, checkpoint and image stores
//! - [`config`] - vocabularies and tuning knobs
//! - [`format`] - export format selection
//! - [`error`] - [`RecipackError`], [`Result`]
//! - [`cli`] - CLI types (feature `cli`)
//! - [`prelude`] - convenient re-exports

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod extractor;
pub mod format;
pub mod message;
pub mod parsers;
pub mod parsing;
pub mod sheet;
pub mod store;

// Re-export the main types at the crate root for convenience
pub use error::{RecipackError, Result};
pub use message::{Block, Message};

/// Convenient re-exports for common usage.
///
/// ```rust
/// use recipack::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Block, Message};

    pub use crate::error::{RecipackError, Result};

    pub use crate::config::{
        CreatorAlias, ExtractionConfig, GrouperConfig, PipelineConfig, SheetConfig, Vocabulary,
    };

    pub use crate::core::classifier::RecipeClassifier;
    pub use crate::core::filter::{filter_since, resolve_checkpoint};
    pub use crate::core::grouper::group_blocks;
    pub use crate::core::models::{
        ChatStats, ExtractedRecipe, ImageRef, ProcessReport, ProcessStats, RecipeRecord,
        SheetStats, StoredRecipe,
    };
    pub use crate::core::normalize::DedupKey;
    pub use crate::core::output::{to_csv, to_json, to_jsonl, write_csv, write_json, write_jsonl};
    pub use crate::core::processor::Pipeline;

    pub use crate::extractor::{
        CommandExtractor, ExtractError, Extraction, RecipeExtractor, RegexFallback,
        ResilientExtractor,
    };

    pub use crate::format::OutputFormat;
    pub use crate::parsers::ChatParser;
    pub use crate::sheet::{Sheet, SheetExtractor, load_sheets};

    pub use crate::store::{
        CheckpointStore, DirectoryImageHost, ImageHost, JsonFileStore, LocalStateFile,
        MemoryCheckpoint, MemoryStore, RecipeStore,
    };
}
