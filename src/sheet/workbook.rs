//! Excel workbook reader.
//!
//! An `.xlsx` file is a zip package of XML parts. The workbook part lists the
//! sheets in tab order and points at one worksheet part per sheet. A
//! worksheet may point at a drawing part, whose anchors place pictures on
//! worksheet rows; the picture bytes live under `xl/media/`.
//!
//! Cell values come out as the text Excel stored: shared and inline strings
//! as written, numbers in their stored form, booleans as `TRUE` / `FALSE`.
//! Formulas contribute their cached value.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use super::{EmbeddedImage, Sheet};
use crate::error::{RecipackError, Result};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Reads every worksheet of the workbook at `path`.
pub fn load_workbook(path: &Path) -> Result<Vec<Sheet>> {
    let file = BufReader::new(File::open(path)?);
    read_workbook(file)
}

/// Reads every worksheet of an `.xlsx` package, in tab order.
///
/// The first worksheet row becomes the header row. Gaps between rows are
/// kept as empty rows, so row positions match the worksheet. Pictures
/// become [`EmbeddedImage`]s on the row of their top-left anchor.
///
/// # Errors
///
/// [`RecipackError::Workbook`] for broken packages and malformed parts,
/// plus I/O errors.
pub fn read_workbook<R: Read + Seek>(reader: R) -> Result<Vec<Sheet>> {
    let mut package = Package {
        archive: ZipArchive::new(reader)?,
    };

    let workbook = package
        .text(WORKBOOK_PART)?
        .ok_or_else(|| RecipackError::workbook(format!("missing {WORKBOOK_PART}")))?;
    let targets = package.relationships(WORKBOOK_PART)?;
    let shared = match package.text(SHARED_STRINGS_PART)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let mut sheets = Vec::new();
    for entry in parse_sheet_list(&workbook)? {
        let Some(part) = targets.get(&entry.rel_id) else {
            warn!(sheet = %entry.name, "worksheet relationship missing; sheet skipped");
            continue;
        };
        let Some(xml) = package.text(part)? else {
            warn!(sheet = %entry.name, part = %part, "worksheet part missing; sheet skipped");
            continue;
        };

        let worksheet = parse_worksheet(&xml, &shared)?;
        let images = match worksheet.drawing {
            Some(rel_id) => package.drawing_images(part, &rel_id)?,
            None => Vec::new(),
        };

        let mut grid = worksheet.rows.into_iter();
        let headers = grid.next().unwrap_or_default();
        let mut sheet = Sheet::new(entry.name, headers, grid.collect());
        sheet.images = images;

        debug!(
            sheet = %sheet.name,
            columns = sheet.headers.len(),
            rows = sheet.rows.len(),
            images = sheet.images.len(),
            "loaded worksheet"
        );
        sheets.push(sheet);
    }
    Ok(sheets)
}

struct Package<R> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> Package<R> {
    /// The part `name` as text, or `None` if the package lacks it.
    fn text(&mut self, name: &str) -> Result<Option<String>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        Ok(Some(text))
    }

    fn bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }

    /// Internal relationship targets of `part`, by id, as package paths.
    fn relationships(&mut self, part: &str) -> Result<HashMap<String, String>> {
        let Some(xml) = self.text(&rels_part(part))? else {
            return Ok(HashMap::new());
        };
        let base = parent(part);
        Ok(parse_relationships(&xml)?
            .into_iter()
            .map(|(id, target)| (id, resolve(base, &target)))
            .collect())
    }

    fn drawing_images(&mut self, sheet_part: &str, rel_id: &str) -> Result<Vec<EmbeddedImage>> {
        let Some(drawing) = self.relationships(sheet_part)?.remove(rel_id) else {
            warn!(part = %sheet_part, rel_id, "drawing relationship missing");
            return Ok(Vec::new());
        };
        let Some(xml) = self.text(&drawing)? else {
            warn!(part = %drawing, "drawing part missing");
            return Ok(Vec::new());
        };
        let media = self.relationships(&drawing)?;

        let mut images = Vec::new();
        for anchor in parse_drawing(&xml)? {
            let Some(target) = media.get(&anchor.embed) else {
                warn!(part = %drawing, rel_id = %anchor.embed, "picture relationship missing");
                continue;
            };
            let Some(bytes) = self.bytes(target)? else {
                warn!(part = %target, "picture part missing");
                continue;
            };
            let filename = target.rsplit('/').next().unwrap_or(target.as_str());
            images.push(EmbeddedImage::new(anchor.row, filename, bytes));
        }
        Ok(images)
    }
}

// ============================================================================
// Package paths
// ============================================================================

fn parent(part: &str) -> &str {
    part.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// `xl/workbook.xml` keeps its relationships in `xl/_rels/workbook.xml.rels`.
fn rels_part(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target against the directory of its source part.
fn resolve(base: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

// ============================================================================
// XML parts
// ============================================================================

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes().flatten() {
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

struct SheetEntry {
    name: String,
    rel_id: String,
}

fn parse_sheet_list(xml: &str) -> Result<Vec<SheetEntry>> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute(&e, b"name")?.unwrap_or_default();
                match attribute(&e, b"id")? {
                    Some(rel_id) => entries.push(SheetEntry { name, rel_id }),
                    None => warn!(sheet = %name, "sheet without relationship id"),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(entries)
}

fn parse_relationships(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut relationships = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let external = attribute(&e, b"TargetMode")?
                    .is_some_and(|mode| mode.eq_ignore_ascii_case("external"));
                if external {
                    continue;
                }
                if let (Some(id), Some(target)) = (attribute(&e, b"Id")?, attribute(&e, b"Target")?) {
                    relationships.push((id, target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(relationships)
}

/// Shared strings in table order. Rich-text runs are concatenated; phonetic
/// hints are dropped.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

struct Worksheet {
    rows: Vec<Vec<String>>,
    drawing: Option<String>,
}

/// Zero-based column of a cell reference such as `AB12`.
fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<char> = reference
        .chars()
        .take_while(char::is_ascii_alphabetic)
        .collect();
    if letters.is_empty() {
        return None;
    }
    letters
        .iter()
        .try_fold(0usize, |acc, c| {
            let digit = (c.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })
        .map(|n| n - 1)
}

fn row_index(element: &BytesStart<'_>, next: usize) -> Result<usize> {
    Ok(attribute(element, b"r")?
        .and_then(|r| r.trim().parse::<usize>().ok())
        .and_then(|r| r.checked_sub(1))
        .unwrap_or(next))
}

fn cell_column(element: &BytesStart<'_>, next: usize) -> Result<usize> {
    Ok(attribute(element, b"r")?
        .and_then(|r| column_index(&r))
        .unwrap_or(next))
}

fn cell_text(kind: Option<&str>, raw: &str, shared: &[String]) -> Result<String> {
    match kind {
        Some("s") => {
            let index: usize = raw.trim().parse().map_err(|_| {
                RecipackError::workbook(format!("bad shared string index '{raw}'"))
            })?;
            shared.get(index).cloned().ok_or_else(|| {
                RecipackError::workbook(format!("shared string {index} out of range"))
            })
        }
        Some("b") => Ok(if raw.trim() == "1" { "TRUE" } else { "FALSE" }.to_string()),
        _ => Ok(raw.to_string()),
    }
}

fn place(rows: &mut Vec<Vec<String>>, row: usize, col: usize, text: String) {
    if text.trim().is_empty() {
        return;
    }
    if rows.len() <= row {
        rows.resize_with(row + 1, Vec::new);
    }
    let cells = &mut rows[row];
    if cells.len() <= col {
        cells.resize(col + 1, String::new());
    }
    cells[col] = text;
}

fn parse_worksheet(xml: &str, shared: &[String]) -> Result<Worksheet> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut drawing = None;

    let (mut row, mut next_row) = (0, 0);
    let (mut col, mut next_col) = (0, 0);
    let mut kind: Option<String> = None;
    let mut value = String::new();
    let mut in_value = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row = row_index(&e, next_row)?;
                    next_row = row + 1;
                    next_col = 0;
                }
                b"c" => {
                    col = cell_column(&e, next_col)?;
                    kind = attribute(&e, b"t")?;
                    value.clear();
                }
                b"v" | b"t" => in_value = true,
                b"drawing" => drawing = attribute(&e, b"id")?,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    row = row_index(&e, next_row)?;
                    next_row = row + 1;
                    next_col = 0;
                }
                b"c" => next_col = cell_column(&e, next_col)? + 1,
                b"drawing" => drawing = attribute(&e, b"id")?,
                _ => {}
            },
            Event::Text(t) if in_value => value.push_str(&t.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    let text = cell_text(kind.as_deref(), &value, shared)?;
                    place(&mut rows, row, col, text);
                    next_col = col + 1;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(Worksheet { rows, drawing })
}

struct Anchor {
    row: usize,
    embed: String,
}

/// Pictures in a drawing part, with the zero-based row of their top-left
/// anchor. Shapes and charts have no picture and are skipped.
fn parse_drawing(xml: &str) -> Result<Vec<Anchor>> {
    let mut reader = Reader::from_str(xml);
    let mut anchors = Vec::new();

    let (mut in_anchor, mut in_from, mut in_row) = (false, false, false);
    let mut row: Option<usize> = None;
    let mut embed: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"twoCellAnchor" | b"oneCellAnchor" => {
                    in_anchor = true;
                    row = None;
                    embed = None;
                }
                b"from" if in_anchor => in_from = true,
                b"row" if in_from => in_row = true,
                b"blip" if in_anchor => embed = attribute(&e, b"embed")?,
                _ => {}
            },
            Event::Empty(e) if in_anchor && e.local_name().as_ref() == b"blip" => {
                embed = attribute(&e, b"embed")?;
            }
            Event::Text(t) if in_row => row = t.unescape()?.trim().parse().ok(),
            Event::End(e) => match e.local_name().as_ref() {
                b"row" => in_row = false,
                b"from" => in_from = false,
                b"twoCellAnchor" | b"oneCellAnchor" => {
                    in_anchor = false;
                    match (row.take(), embed.take()) {
                        (Some(row), Some(embed)) => anchors.push(Anchor { row, embed }),
                        _ => debug!("drawing anchor without a picture"),
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(anchors)
}
