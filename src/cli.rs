//! Command-line interface definition using clap.
//!
//! - [`Args`] / [`Command`] - the `process` and `export` subcommands
//! - [`ProcessArgs::pipeline_config`] - layers defaults, `--config` and flags
//! - [`ExportFormat`] - export format flag, convertible to
//!   [`format::OutputFormat`](crate::format::OutputFormat)

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::format::OutputFormat;

/// Find recipes in WhatsApp exports and spreadsheet dumps.
#[derive(Parser, Debug, Clone)]
#[command(name = "recipack")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    recipack process chat.txt
    recipack process chat.txt recetas.csv --since 2025-10-01
    recipack process chat.txt --extractor-cmd 'python extract.py'
    recipack export -o recetas.jsonl
    recipack export -f json")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Extract recipes from chat exports (.txt) and spreadsheets (.xlsx, .csv, .tsv)
    Process(ProcessArgs),

    /// Write stored recipes as CSV, JSON or JSONL
    Export(ExportArgs),
}

/// Arguments of `recipack process`.
#[derive(clap::Args, Debug, Clone)]
pub struct ProcessArgs {
    /// Input files
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Only process chat messages from this date on (YYYY-MM-DD); overrides the stored checkpoint
    #[arg(long, value_name = "DATE")]
    pub since: Option<String>,

    /// Recipe store (JSON file)
    #[arg(long, default_value = "recipes.json")]
    pub store: PathBuf,

    /// Directory holding last_processed.json
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Pipeline configuration (JSON)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Extraction command: receives a block on stdin, answers JSON on stdout.
    /// Without it, recipes are extracted with local heuristics only.
    #[arg(long, value_name = "CMD")]
    pub extractor_cmd: Option<String>,

    /// Copy embedded spreadsheet images into this directory
    #[arg(long, value_name = "DIR")]
    pub images_dir: Option<PathBuf>,

    /// Print per-file reports as JSON
    #[arg(long)]
    pub json: bool,

    /// Minimum delay between extraction calls, in milliseconds
    #[arg(long, env = "RECIPACK_MIN_INTERVAL_MS", value_name = "MS")]
    pub min_interval_ms: Option<u64>,

    /// Attempts per block before falling back to local extraction
    #[arg(long, env = "RECIPACK_MAX_ATTEMPTS", value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Base retry delay in milliseconds, multiplied by the attempt number
    #[arg(long, env = "RECIPACK_RETRY_DELAY_MS", value_name = "MS")]
    pub retry_delay_ms: Option<u64>,
}

impl ProcessArgs {
    /// Builds the pipeline configuration: defaults, then `--config`, then flags.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(dir) = &self.state_dir {
            config.state_dir.clone_from(dir);
        }
        if let Some(ms) = self.min_interval_ms {
            config.extraction.min_interval_ms = ms;
        }
        if let Some(attempts) = self.max_attempts {
            config.extraction.max_attempts = attempts;
        }
        if let Some(ms) = self.retry_delay_ms {
            config.extraction.retry_delay_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Arguments of `recipack export`.
#[derive(clap::Args, Debug, Clone)]
pub struct ExportArgs {
    /// Recipe store (JSON file)
    #[arg(long, default_value = "recipes.json")]
    pub store: PathBuf,

    /// Output file; standard output when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format; guessed from the output extension when omitted
    #[arg(short, long, value_enum)]
    pub format: Option<ExportFormat>,
}

impl ExportArgs {
    /// The format to write: `--format`, else the output extension, else CSV.
    pub fn resolved_format(&self) -> Result<OutputFormat> {
        match (self.format, &self.output) {
            (Some(format), _) => Ok(format.into()),
            (None, Some(path)) => OutputFormat::from_path(path),
            (None, None) => Ok(OutputFormat::Csv),
        }
    }

    /// The output path, if any.
    pub fn output_path(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

/// Export format options.
///
/// # Example
///
/// ```rust
/// use recipack::cli::ExportFormat;
/// use recipack::format::OutputFormat;
///
/// let format: OutputFormat = ExportFormat::Jsonl.into();
/// assert_eq!(format.extension(), "jsonl");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// CSV with semicolon delimiter
    #[default]
    Csv,

    /// JSON array
    Json,

    /// JSON Lines - one recipe per line
    #[value(alias = "ndjson")]
    Jsonl,
}

impl From<ExportFormat> for OutputFormat {
    fn from(format: ExportFormat) -> OutputFormat {
        match format {
            ExportFormat::Csv => OutputFormat::Csv,
            ExportFormat::Json => OutputFormat::Json,
            ExportFormat::Jsonl => OutputFormat::Jsonl,
        }
    }
}
