//! # recipack CLI
//!
//! Command-line interface for the recipack library.

use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use recipack::RecipackError;
use recipack::cli::{Args, Command, ExportArgs, ProcessArgs};
use recipack::core::models::{ProcessReport, ProcessStats};
use recipack::core::processor::Pipeline;
use recipack::extractor::{CommandExtractor, RecipeExtractor, RegexFallback, ResilientExtractor};
use recipack::format::{to_format_string, write_to_format};
use recipack::store::{DirectoryImageHost, JsonFileStore, LocalStateFile, RecipeStore};

fn main() {
    init_tracing();
    let args = <Args as ClapParser>::parse();

    let result = match args.command {
        Command::Process(args) => run_process(&args),
        Command::Export(args) => run_export(&args).map(|()| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("❌ Error: {e}");
            process::exit(1);
        }
    }
}

/// Logs go to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Processes every file; returns `false` if any of them failed.
fn run_process(args: &ProcessArgs) -> Result<bool, RecipackError> {
    let start = Instant::now();
    let config = args.pipeline_config()?;
    debug!(?config, "resolved configuration");

    let extractor: Box<dyn RecipeExtractor> = match &args.extractor_cmd {
        Some(line) => {
            let command = CommandExtractor::from_command_line(line).ok_or_else(|| {
                RecipackError::invalid_config("--extractor-cmd must name a program")
            })?;
            info!(program = command.program(), "using external extractor");
            Box::new(ResilientExtractor::new(command, config.extraction))
        }
        None => {
            info!("no extractor command; using local heuristics");
            Box::new(RegexFallback::new())
        }
    };

    let store = JsonFileStore::open(&args.store)?;
    let checkpoints = LocalStateFile::new(&config.state_dir);
    let mut pipeline = Pipeline::new(config, extractor, store, checkpoints);
    if let Some(dir) = &args.images_dir {
        pipeline = pipeline.with_image_host(DirectoryImageHost::new(dir));
    }

    let reports: Vec<ProcessReport> = args
        .files
        .iter()
        .map(|file| pipeline.run(file, args.since.as_deref()))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_summary(&reports);
        println!();
        println!(
            "⚡ {} file(s) in {:.2}s",
            reports.len(),
            start.elapsed().as_secs_f64()
        );
    }

    Ok(reports.iter().all(|r| !r.is_failure()))
}

fn print_summary(reports: &[ProcessReport]) {
    println!("📦 recipack v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for report in reports {
        let file = report.file.display();
        match (&report.stats, &report.error) {
            (_, Some(error)) => println!("❌ {file}: {error}"),
            (Some(ProcessStats::Chat(s)), None) => println!(
                "✅ {file}: {} messages, {} blocks, {} recipes extracted, {} inserted, {} failed blocks",
                s.messages_processed,
                s.blocks_processed,
                s.recipes_extracted,
                s.recipes_inserted,
                s.failed_blocks
            ),
            (Some(ProcessStats::Sheet(s)), None) => println!(
                "✅ {file}: {} rows extracted, {} inserted",
                s.extracted, s.inserted
            ),
            (None, None) => println!("✅ {file}: nothing to do"),
        }
    }
}

fn run_export(args: &ExportArgs) -> Result<(), RecipackError> {
    let format = args.resolved_format()?;
    let recipes = JsonFileStore::open(&args.store)?.list()?;

    match args.output_path() {
        Some(path) => {
            write_to_format(&recipes, path, format)?;
            eprintln!(
                "💾 Wrote {} recipes to {} ({format})",
                recipes.len(),
                path.display()
            );
        }
        None => print!("{}", to_format_string(&recipes, format)?),
    }
    Ok(())
}
