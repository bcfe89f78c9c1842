// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Picturebook — assemble a folder of pictures into a PDF picture book.
//
// Entry point. Initialises logging, merges flags over the optional JSON
// configuration, runs discovery into a book and saves it.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use picturebook_core::human_errors::humanize_error;
use picturebook_core::{
    BookConfig, CaptionMode, HalftoneMode, IndexMode, Orientation, PicturebookError,
    PreProcessMode,
};
use picturebook_document::{Indexer, Options, PictureBook};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "picturebook")]
#[command(version)]
#[command(about = "Assemble images into a captioned, print-ready PDF picture book", long_about = None)]
struct Cli {
    /// Image directories, image files or file lists, depending on --mode
    #[arg(value_name = "SOURCE", required = true)]
    sources: Vec<PathBuf>,

    /// JSON configuration file; flags override its values
    #[arg(long, value_name = "FILE", env = "PICTUREBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Output PDF
    #[arg(long, value_name = "FILE")]
    filename: Option<PathBuf>,

    /// Page orientation: portrait (P) or landscape (L)
    #[arg(long)]
    orientation: Option<Orientation>,

    /// Paper size: letter, legal, tabloid, a3, a4, a5 or custom
    #[arg(long)]
    size: Option<String>,

    /// Page width in inches (custom size only)
    #[arg(long)]
    width: Option<f64>,

    /// Page height in inches (custom size only)
    #[arg(long)]
    height: Option<f64>,

    /// Layout resolution in dots per inch
    #[arg(long)]
    dpi: Option<f64>,

    /// Frame thickness around each picture, in inches
    #[arg(long)]
    border: Option<f64>,

    /// Caption source: default, filename, parent, cooperhewitt or none
    #[arg(long)]
    caption: Option<CaptionMode>,

    /// Only include paths matching this regex (repeatable, all must match)
    #[arg(long, value_name = "REGEX")]
    include: Vec<String>,

    /// Leave out paths matching this regex (repeatable)
    #[arg(long, value_name = "REGEX")]
    exclude: Vec<String>,

    /// Pre-processing step: rotate or halftone (repeatable, applied in order)
    #[arg(long = "pre-process", value_name = "STEP")]
    pre_process: Vec<PreProcessMode>,

    /// Halftone algorithm: atkinson or threshold
    #[arg(long)]
    halftone: Option<HalftoneMode>,

    /// How sources are read: directory, files or filelist
    #[arg(long)]
    mode: Option<IndexMode>,

    /// Worker threads (0 = one per core)
    #[arg(long)]
    workers: Option<usize>,

    /// Verbose logging, including every page's layout
    #[arg(long)]
    debug: bool,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    fn apply(&self, config: &mut BookConfig) {
        if let Some(filename) = &self.filename {
            config.filename = filename.clone();
        }
        if let Some(orientation) = self.orientation {
            config.orientation = orientation;
        }
        if let Some(size) = &self.size {
            config.size = size.clone();
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(dpi) = self.dpi {
            config.dpi = dpi;
        }
        if let Some(border) = self.border {
            config.border = border;
        }
        if let Some(caption) = self.caption {
            config.caption = caption;
        }
        if !self.include.is_empty() {
            config.include = self.include.clone();
        }
        if !self.exclude.is_empty() {
            config.exclude = self.exclude.clone();
        }
        if !self.pre_process.is_empty() {
            config.pre_process = self.pre_process.clone();
        }
        if let Some(halftone) = self.halftone {
            config.halftone = halftone;
        }
        if let Some(mode) = self.mode {
            config.index_mode = mode;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.debug |= self.debug;
    }

    fn resolve_config(&self) -> Result<BookConfig> {
        let mut config = match &self.config {
            Some(path) => BookConfig::load(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?,
            None => BookConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.resolve_config()?;
    tracing::debug!(?config, "Configuration resolved");

    let options = Options::from_config(&config)?;
    let indexer = Indexer::from_config(&config);
    let book = PictureBook::new(options)?;

    let report = book.add_pictures(&indexer, &cli.sources)?;
    let saved = book
        .save(&config.filename)
        .with_context(|| format!("failed to write {}", config.filename.display()))?;

    println!(
        "{}: {} pages ({} skipped, {} failed)",
        saved.path().display(),
        saved.page_count(),
        report.skipped,
        report.failed
    );

    saved.wait_for_cleanup();
    Ok(())
}

/// Print a fatal error, in plain English when it is one of ours.
fn report(err: &anyhow::Error) {
    eprintln!("{}", describe(err));
}

/// Message for `err`, labelled by its severity when it is one of ours.
fn describe(err: &anyhow::Error) -> String {
    match err.chain().find_map(|cause| cause.downcast_ref::<PicturebookError>()) {
        Some(known) => {
            let human = humanize_error(known);
            format!(
                "{}: {}\n  {}",
                human.severity.label(),
                human.message,
                human.suggestion
            )
        }
        None => format!("error: {err:#}"),
    }
}
