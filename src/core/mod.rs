//! Core recipe processing.
//!
//! - [`classifier`] - recipe heuristics over messages, lines and cells
//! - [`grouper`] - seed + continuation blocks
//! - [`filter`] - checkpoint filtering and derivation
//! - [`normalize`] - folding, dedup keys, creator aliases
//! - [`models`] - records, candidates, statistics
//! - [`processor`] - the per-file pipeline
//! - [`output`] - export writers (CSV, JSON, JSONL)
//!
//! # Quick Start
//!
//! ```rust
//! use recipack::core::{RecipeClassifier, group_blocks};
//! use recipack::config::GrouperConfig;
//! use recipack::parsers::ChatParser;
//!
//! let messages = ChatParser::new().parse_str("[01/10/25, 18:02] Ana: Receta de flan\n- 4 huevos");
//! let blocks = group_blocks(&messages, &RecipeClassifier::default(), &GrouperConfig::default());
//! assert_eq!(blocks.len(), 1);
//! ```

pub mod classifier;
pub mod filter;
pub mod grouper;
pub mod models;
pub mod normalize;
pub mod output;
pub mod processor;

pub use classifier::RecipeClassifier;
pub use filter::{Checkpoint, filter_since, resolve_checkpoint};
pub use grouper::group_blocks;
pub use models::{ProcessReport, ProcessStats, RecipeRecord, StoredRecipe};
pub use normalize::DedupKey;
pub use output::{to_csv, to_json, to_jsonl, write_csv, write_json, write_jsonl};
pub use processor::{InputKind, Pipeline};
