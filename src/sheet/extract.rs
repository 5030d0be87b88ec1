//! Spreadsheet row extraction.
//!
//! Every data row is a recipe candidate. Column roles are guessed from the
//! header row, with positional fallbacks for sheets whose headers say nothing:
//!
//! | Role | Header match | Fallback |
//! |------|--------------|----------|
//! | name | - | column 0 |
//! | creator | `author`, `creator`, ... | sheet name, then `Excel Import` |
//! | ingredients | `ingredient` | column 1, then column 2 |
//! | steps | `preparación`, `steps`, ... | columns 2-4 that read like prose |
//! | images | `image`, `photo`, `url` | URLs in any column past 1 |
//!
//! Rows are deduplicated by [`DedupKey`] against the store (read once per
//! file) and against everything already accepted in the same file.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use super::{EmbeddedImage, Sheet};
use crate::config::SheetConfig;
use crate::core::classifier::RecipeClassifier;
use crate::core::models::{ImageRef, RecipeCandidate, SheetStats};
use crate::core::normalize::{CreatorAliases, DedupKey, fold};
use crate::error::Result;
use crate::store::{ImageHost, RecipeStore, SaveOutcome};

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s,;"'<>]+"#).expect("valid url pattern"));

const URL_PREFIXES: [&str; 4] = ["http://", "https://", "www.", "ftp://"];
const IMAGE_SUFFIXES: [&str; 8] = [
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp", ".heic", ".svg",
];

/// Returns `true` if `cell` is a link or an image file name.
fn is_url_like(cell: &str) -> bool {
    let lower = cell.trim().to_lowercase();
    URL_PREFIXES.iter().any(|p| lower.starts_with(p))
        || IMAGE_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// Why a row produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSkip {
    /// Column 0 is empty.
    BlankName,
    /// Column 0 reads like a header.
    HeaderRow,
    /// The only content is a link or image name.
    LinkOnly,
    /// The `(creator, name)` key is already known.
    Duplicate,
    /// No ingredients could be found.
    NoIngredients,
}

/// Column roles of one sheet, from its headers.
#[derive(Debug, Default)]
struct ColumnLayout {
    creator: Option<usize>,
    ingredients: Vec<usize>,
    steps: Vec<usize>,
    images: Vec<usize>,
}

fn header_matches(header: &str, fragments: &[String]) -> bool {
    let header = fold(header);
    !header.is_empty()
        && fragments
            .iter()
            .map(|f| fold(f))
            .any(|f| !f.is_empty() && header.contains(&f))
}

impl ColumnLayout {
    fn from_headers(headers: &[String], config: &SheetConfig) -> Self {
        let mut layout = Self::default();
        for (idx, header) in headers.iter().enumerate() {
            if idx == 0 {
                continue;
            }
            if layout.creator.is_none() && header_matches(header, &config.creator_headers) {
                layout.creator = Some(idx);
            } else if header_matches(header, &config.ingredient_headers) {
                layout.ingredients.push(idx);
            } else if header_matches(header, &config.step_headers) {
                layout.steps.push(idx);
            } else if header_matches(header, &config.image_headers) {
                layout.images.push(idx);
            }
        }
        layout
    }

    fn is_assigned(&self, col: usize) -> bool {
        self.creator == Some(col)
            || self.ingredients.contains(&col)
            || self.steps.contains(&col)
            || self.images.contains(&col)
    }
}

/// Turns spreadsheet rows into stored recipes.
#[derive(Debug, Clone)]
pub struct SheetExtractor {
    config: SheetConfig,
    classifier: RecipeClassifier,
    aliases: CreatorAliases,
}

impl SheetExtractor {
    /// Creates an extractor.
    pub fn new(config: SheetConfig, classifier: RecipeClassifier) -> Self {
        let aliases = CreatorAliases::new(&config.creator_aliases);
        Self {
            config,
            classifier,
            aliases,
        }
    }

    /// Extracts every sheet of one file.
    ///
    /// The store's existing keys are read once, up front; one key set then
    /// spans all sheets, so a recipe repeated across sheets is stored once.
    pub fn extract_workbook(
        &self,
        sheets: &[Sheet],
        store: &mut dyn RecipeStore,
        mut images: Option<&mut dyn ImageHost>,
    ) -> Result<SheetStats> {
        let mut known = store.existing_keys()?;
        debug!(existing = known.len(), "loaded existing recipe keys");

        let mut stats = SheetStats::default();
        for sheet in sheets {
            let sheet_stats = self.extract_sheet(sheet, store, reborrow(&mut images), &mut known);
            info!(
                sheet = %sheet.name,
                extracted = sheet_stats.extracted,
                inserted = sheet_stats.inserted,
                "processed sheet"
            );
            stats.absorb(sheet_stats);
        }
        Ok(stats)
    }

    /// Extracts one sheet, skipping keys in `known` and adding new ones.
    pub fn extract_sheet(
        &self,
        sheet: &Sheet,
        store: &mut dyn RecipeStore,
        mut images: Option<&mut dyn ImageHost>,
        known: &mut HashSet<DedupKey>,
    ) -> SheetStats {
        let layout = ColumnLayout::from_headers(&sheet.headers, &self.config);

        let pseudo_row;
        let (rows, synthesized) =
            if sheet.rows.is_empty() && sheet.headers.iter().any(|h| !h.is_empty()) {
                pseudo_row = vec![sheet.headers.clone()];
                (pseudo_row.as_slice(), true)
            } else {
                (sheet.rows.as_slice(), false)
            };
        if synthesized {
            debug!(sheet = %sheet.name, "headers only; treating headers as a row");
        }

        let embedded = self.images_by_row(sheet, synthesized);
        let mut stats = SheetStats::default();

        for (row_index, row) in rows.iter().enumerate() {
            let mut candidate = match self.assemble_row(&layout, &sheet.name, row_index, row) {
                Ok(candidate) => candidate,
                Err(reason) => {
                    debug!(sheet = %sheet.name, row = row_index, ?reason, "skipping row");
                    continue;
                }
            };

            let key = DedupKey::new(&candidate.creator, &candidate.name);
            if known.contains(&key) {
                debug!(sheet = %sheet.name, row = row_index, %key, reason = ?RowSkip::Duplicate, "skipping row");
                continue;
            }

            if let Some(row_images) = embedded.get(&row_index) {
                self.upload_images(
                    row_images,
                    &mut candidate,
                    reborrow(&mut images),
                    &sheet.name,
                );
            }

            stats.extracted += 1;
            let name = candidate.name.clone();
            match store.save(candidate.into_record()) {
                Ok(SaveOutcome::Inserted(id)) => {
                    debug!(sheet = %sheet.name, row = row_index, id, recipe = %name, "inserted recipe");
                    stats.inserted += 1;
                    known.insert(key);
                }
                Ok(SaveOutcome::Existing(id)) => {
                    debug!(sheet = %sheet.name, row = row_index, id, recipe = %name, "recipe already stored");
                    known.insert(key);
                }
                Err(err) => {
                    warn!(sheet = %sheet.name, row = row_index, error = %err, "could not save recipe");
                }
            }
        }

        stats
    }

    /// Builds the candidate for one row, without dedup or embedded images.
    pub fn assemble(&self, sheet: &Sheet, row_index: usize) -> std::result::Result<RecipeCandidate, RowSkip> {
        let layout = ColumnLayout::from_headers(&sheet.headers, &self.config);
        let row = sheet.rows.get(row_index).map_or(&[][..], Vec::as_slice);
        self.assemble_row(&layout, &sheet.name, row_index, row)
    }

    fn assemble_row(
        &self,
        layout: &ColumnLayout,
        sheet_name: &str,
        row_index: usize,
        row: &[String],
    ) -> std::result::Result<RecipeCandidate, RowSkip> {
        let cell = |col: usize| row.get(col).map_or("", |c| c.trim());

        let name = cell(0);
        if name.is_empty() {
            return Err(RowSkip::BlankName);
        }
        let lower_name = name.to_lowercase();
        if self
            .config
            .header_words
            .iter()
            .any(|w| !w.is_empty() && lower_name.contains(&w.to_lowercase()))
        {
            return Err(RowSkip::HeaderRow);
        }

        let filled: Vec<&str> = row.iter().map(|c| c.trim()).filter(|c| !c.is_empty()).collect();
        if filled.len() == 1 && is_url_like(filled[0]) {
            return Err(RowSkip::LinkOnly);
        }

        let creator = self.resolve_creator(layout, sheet_name, &cell);

        let mut used: HashSet<usize> = HashSet::from([0]);
        used.extend(layout.creator);
        let ingredients = self.ingredients(layout, &cell, &mut used);
        if ingredients.is_empty() {
            return Err(RowSkip::NoIngredients);
        }
        let steps = self.steps(layout, &cell, &mut used, row.len());
        let images = self.linked_images(layout, row, &creator, row_index);

        Ok(RecipeCandidate {
            creator,
            name: name.to_string(),
            ingredients,
            steps,
            images,
            row_index,
        })
    }

    fn resolve_creator<'r>(
        &self,
        layout: &ColumnLayout,
        sheet_name: &str,
        cell: &impl Fn(usize) -> &'r str,
    ) -> String {
        let raw = layout
            .creator
            .map(|col| cell(col))
            .filter(|c| !c.is_empty())
            .or_else(|| Some(sheet_name.trim()).filter(|s| !s.is_empty()))
            .unwrap_or(&self.config.fallback_creator);
        self.aliases.resolve(raw)
    }

    fn ingredients<'r>(
        &self,
        layout: &ColumnLayout,
        cell: &impl Fn(usize) -> &'r str,
        used: &mut HashSet<usize>,
    ) -> String {
        if !layout.ingredients.is_empty() {
            used.extend(layout.ingredients.iter().copied());
            return join_cells(layout.ingredients.iter().map(|&col| cell(col)));
        }
        for col in [1, 2] {
            let value = cell(col);
            if !value.is_empty() && !is_url_like(value) && !layout.is_assigned(col) {
                used.insert(col);
                return value.to_string();
            }
        }
        String::new()
    }

    fn steps<'r>(
        &self,
        layout: &ColumnLayout,
        cell: &impl Fn(usize) -> &'r str,
        used: &mut HashSet<usize>,
        width: usize,
    ) -> Option<String> {
        let step_cols: Vec<usize> = layout
            .steps
            .iter()
            .copied()
            .filter(|col| !used.contains(col))
            .collect();

        let joined = if step_cols.is_empty() {
            let last = self.config.step_scan_last.min(width.saturating_sub(1));
            let scanned: Vec<&str> = (self.config.step_scan_first..=last)
                .filter(|col| !used.contains(col) && !layout.images.contains(col))
                .map(|col| cell(col))
                .filter(|value| {
                    !value.is_empty()
                        && !is_url_like(value)
                        && !self
                            .classifier
                            .looks_like_ingredients(value, self.config.ingredient_density_threshold)
                })
                .collect();
            join_cells(scanned.into_iter())
        } else {
            used.extend(step_cols.iter().copied());
            join_cells(step_cols.iter().map(|&col| cell(col)))
        };

        (!joined.is_empty()).then_some(joined)
    }

    fn linked_images(
        &self,
        layout: &ColumnLayout,
        row: &[String],
        creator: &str,
        row_index: usize,
    ) -> Vec<ImageRef> {
        let mut cols: Vec<usize> = layout.images.clone();
        cols.extend(2..row.len());

        let mut seen = HashSet::new();
        let mut images = Vec::new();
        for col in cols {
            let Some(value) = row.get(col) else { continue };
            for found in URL.find_iter(value) {
                let url = found.as_str();
                if seen.insert(url.to_string()) {
                    images.push(ImageRef::new(url, creator).with_row(row_index));
                }
            }
        }
        images
    }

    /// Groups embedded images by data row.
    ///
    /// Anchors are worksheet rows; the configured header rows are subtracted.
    /// Images anchored inside the header cannot be placed and are reported.
    fn images_by_row<'s>(
        &self,
        sheet: &'s Sheet,
        synthesized: bool,
    ) -> HashMap<usize, Vec<&'s EmbeddedImage>> {
        let mut by_row: HashMap<usize, Vec<&EmbeddedImage>> = HashMap::new();
        for image in &sheet.images {
            let row = if synthesized {
                Some(0)
            } else {
                image.anchor_row.checked_sub(self.config.header_rows)
            };
            match row {
                Some(row) => by_row.entry(row).or_default().push(image),
                None => warn!(
                    sheet = %sheet.name,
                    anchor_row = image.anchor_row,
                    file = %image.filename,
                    "image anchored in header rows; not assigned to any recipe"
                ),
            }
        }
        by_row
    }

    fn upload_images(
        &self,
        embedded: &[&EmbeddedImage],
        candidate: &mut RecipeCandidate,
        host: Option<&mut dyn ImageHost>,
        sheet_name: &str,
    ) {
        let Some(host) = host else {
            debug!(
                sheet = %sheet_name,
                row = candidate.row_index,
                images = embedded.len(),
                "no image host; embedded images skipped"
            );
            return;
        };
        for image in embedded {
            match host.upload(&image.bytes, &image.filename) {
                Ok(url) => candidate.images.push(
                    ImageRef::new(url, candidate.creator.clone()).with_row(candidate.row_index),
                ),
                Err(err) => warn!(
                    sheet = %sheet_name,
                    row = candidate.row_index,
                    file = %image.filename,
                    error = %err,
                    "image upload failed"
                ),
            }
        }
    }
}

fn reborrow<'s>(host: &'s mut Option<&mut dyn ImageHost>) -> Option<&'s mut dyn ImageHost> {
    host.as_mut().map(|h| &mut **h as &mut dyn ImageHost)
}

fn join_cells<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
