//! Pipeline orchestration.
//!
//! [`Pipeline`] processes one input file at a time and dispatches on the file
//! extension:
//!
//! - `.txt`: parse, resolve checkpoint, filter, group, extract per block,
//!   save, write the next checkpoint
//! - `.xlsx` / `.xlsm` / `.csv` / `.tsv`: load sheets and extract rows
//!
//! Block and row failures are logged and skipped; only file-level problems
//! end a run early, and those leave the checkpoint untouched.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::core::classifier::RecipeClassifier;
use crate::core::filter::{checkpoint_from_messages, filter_since, resolve_checkpoint};
use crate::core::grouper::group_blocks;
use crate::core::models::{ChatStats, ProcessReport, ProcessStats, SheetStats};
use crate::core::normalize::DedupKey;
use crate::error::{RecipackError, Result};
use crate::extractor::{FALLBACK_WARNING, RecipeExtractor};
use crate::message::Block;
use crate::parsers::ChatParser;
use crate::parsing::whatsapp::to_iso_datetime;
use crate::sheet::{SheetExtractor, is_sheet_extension, load_sheets};
use crate::store::{CheckpointStore, ImageHost, ProcessingState, RecipeStore, SaveOutcome};

/// What kind of input a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// WhatsApp TXT export.
    Chat,
    /// Delimited spreadsheet export.
    Sheet,
}

impl InputKind {
    /// Detects the input kind from the file extension.
    ///
    /// # Errors
    ///
    /// [`RecipackError::UnsupportedFormat`] for unknown extensions.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if extension == "txt" {
            Ok(InputKind::Chat)
        } else if is_sheet_extension(&extension) {
            Ok(InputKind::Sheet)
        } else {
            Err(RecipackError::unsupported_format(path))
        }
    }
}

/// The recipe pipeline and its collaborators.
///
/// # Example
///
/// ```rust,no_run
/// use recipack::config::PipelineConfig;
/// use recipack::core::processor::Pipeline;
/// use recipack::extractor::{RegexFallback, ResilientExtractor};
/// use recipack::store::{JsonFileStore, LocalStateFile};
///
/// let config = PipelineConfig::default();
/// let extractor = ResilientExtractor::new(RegexFallback::new(), config.extraction);
/// let store = JsonFileStore::open("recipes.json")?;
/// let checkpoints = LocalStateFile::new(&config.state_dir);
///
/// let mut pipeline = Pipeline::new(config, extractor, store, checkpoints);
/// let report = pipeline.run("chat.txt".as_ref(), None);
/// println!("{report:?}");
/// # Ok::<(), recipack::RecipackError>(())
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    classifier: RecipeClassifier,
    parser: ChatParser,
    sheets: SheetExtractor,
    extractor: Box<dyn RecipeExtractor>,
    store: Box<dyn RecipeStore>,
    checkpoints: Box<dyn CheckpointStore>,
    images: Option<Box<dyn ImageHost>>,
}

impl Pipeline {
    /// Builds a pipeline. Embedded spreadsheet images are skipped until an
    /// image host is set with [`Pipeline::with_image_host`].
    pub fn new(
        config: PipelineConfig,
        extractor: impl RecipeExtractor + 'static,
        store: impl RecipeStore + 'static,
        checkpoints: impl CheckpointStore + 'static,
    ) -> Self {
        let classifier = RecipeClassifier::new(&config.vocabulary);
        Self {
            parser: ChatParser::with_classifier(classifier.clone()),
            sheets: SheetExtractor::new(config.sheet.clone(), classifier.clone()),
            classifier,
            config,
            extractor: Box::new(extractor),
            store: Box::new(store),
            checkpoints: Box::new(checkpoints),
            images: None,
        }
    }

    /// Builder-style method to set the image host.
    #[must_use]
    pub fn with_image_host(mut self, host: impl ImageHost + 'static) -> Self {
        self.images = Some(Box::new(host));
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The recipe store.
    pub fn store(&self) -> &dyn RecipeStore {
        self.store.as_ref()
    }

    /// The checkpoint store.
    pub fn checkpoints(&self) -> &dyn CheckpointStore {
        self.checkpoints.as_ref()
    }

    /// Processes one file and always returns a report.
    ///
    /// `since` (`YYYY-MM-DD`) overrides the stored checkpoint for chat input.
    pub fn run(&mut self, path: &Path, since: Option<&str>) -> ProcessReport {
        match self.process(path, since) {
            Ok(stats) => ProcessReport::ok(path, stats),
            Err(err) => {
                warn!(file = %path.display(), error = %err, "file not processed");
                ProcessReport::failed(path, err)
            }
        }
    }

    /// Processes one file.
    ///
    /// # Errors
    ///
    /// Unsupported extensions, unreadable files and failures of the store's
    /// key lookup. Nothing is checkpointed when this fails.
    pub fn process(&mut self, path: &Path, since: Option<&str>) -> Result<ProcessStats> {
        let stats = match InputKind::from_path(path)? {
            InputKind::Chat => ProcessStats::Chat(self.process_chat(path, since)?),
            InputKind::Sheet => ProcessStats::Sheet(self.process_sheet(path)?),
        };
        info!(
            file = %path.display(),
            extracted = stats.extracted(),
            inserted = stats.inserted(),
            "processed file"
        );
        Ok(stats)
    }

    /// Runs the chat path over an already loaded export.
    pub fn process_chat_str(&mut self, content: &str, since: Option<&str>) -> ChatStats {
        let messages = self.parser.parse_str(content);
        self.process_messages(messages, since)
    }

    fn process_chat(&mut self, path: &Path, since: Option<&str>) -> Result<ChatStats> {
        let messages = self.parser.parse(path)?;
        Ok(self.process_messages(messages, since))
    }

    fn process_messages(
        &mut self,
        messages: Vec<crate::Message>,
        since: Option<&str>,
    ) -> ChatStats {
        let stored = match self.checkpoints.get_last_checkpoint() {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "could not read checkpoint; processing everything");
                None
            }
        };
        let checkpoint = resolve_checkpoint(since.map(str::to_string), stored);
        info!(
            checkpoint = checkpoint.as_deref().unwrap_or("none"),
            messages = messages.len(),
            "starting chat run"
        );

        let last_timestamp = messages.last().map(|m| m.timestamp.clone());
        let next_checkpoint = checkpoint_from_messages(&messages);

        let filtered = filter_since(messages, checkpoint.as_deref());
        let blocks = group_blocks(&filtered, &self.classifier, &self.config.grouper);

        let mut stats = ChatStats {
            messages_processed: filtered.len(),
            ..ChatStats::default()
        };
        let mut seen = HashSet::new();
        for (index, block) in blocks.iter().enumerate() {
            stats.blocks_processed += 1;
            self.process_block(index, block, &mut stats, &mut seen);
        }

        let state = ProcessingState::from_last_timestamp(last_timestamp.as_deref());
        match self.checkpoints.set_last_checkpoint(&state) {
            Ok(()) => info!(
                checkpoint = next_checkpoint.as_deref().unwrap_or("none"),
                "checkpoint updated"
            ),
            Err(err) => warn!(error = %err, "could not write checkpoint"),
        }

        stats
    }

    fn process_block(
        &mut self,
        index: usize,
        block: &Block,
        stats: &mut ChatStats,
        seen: &mut HashSet<DedupKey>,
    ) {
        let extraction = match self.extractor.extract(&block.text) {
            Ok(extraction) => extraction,
            Err(err) => {
                warn!(block = index, author = %block.author, error = %err, "block extraction failed");
                stats.failed_blocks += 1;
                return;
            }
        };
        match extraction.warning.as_deref() {
            Some(FALLBACK_WARNING) => debug!(block = index, "extracted locally"),
            Some(warning) => warn!(block = index, author = %block.author, %warning, "extraction degraded"),
            None => {}
        }
        debug!(block = index, recipes = extraction.recipes.len(), "block extracted");

        for recipe in extraction.recipes {
            stats.recipes_extracted += 1;
            if !recipe.has_ingredients() {
                warn!(block = index, name = ?recipe.name, "recipe without ingredients skipped");
                continue;
            }

            let mut record = recipe.into_record(&block.author);
            if record.message_date.is_none() {
                record.message_date = to_iso_datetime(&block.timestamp);
            }

            let key = record.dedup_key();
            if seen.contains(&key) {
                debug!(block = index, %key, "recipe already saved in this run");
                continue;
            }

            let name = record.name.clone();
            match self.store.save(record) {
                Ok(SaveOutcome::Inserted(id)) => {
                    debug!(block = index, id, recipe = %name, "inserted recipe");
                    stats.recipes_inserted += 1;
                    seen.insert(key);
                }
                Ok(SaveOutcome::Existing(id)) => {
                    debug!(block = index, id, recipe = %name, "recipe already stored");
                    seen.insert(key);
                }
                Err(err) => {
                    warn!(block = index, recipe = %name, error = %err, "could not save recipe");
                }
            }
        }
    }

    fn process_sheet(&mut self, path: &Path) -> Result<SheetStats> {
        let sheets = load_sheets(path)?;
        let images = self
            .images
            .as_mut()
            .map(|host| host.as_mut() as &mut dyn ImageHost);
        self.sheets
            .extract_workbook(&sheets, self.store.as_mut(), images)
    }
}
