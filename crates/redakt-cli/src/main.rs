// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// redakt — command-line front end.
//
// Entry point. Initialises logging, parses the command line, and drives the
// composition pipeline: plan file in, merged PDF out.

mod plan;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use redakt_compose::{MediaBoxDecoder, PdfAssembler, SourceDecoder, export_document};
use redakt_core::SessionConfig;
use redakt_core::error::Result;
use redakt_raster::Renderer;

use plan::ComposePlan;

#[derive(Debug, Parser)]
#[command(name = "redakt", version, about = "Assemble, annotate, and redact PDF pages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build and export a document from a JSON composition plan.
    Compose {
        /// Path to the plan file.
        plan: PathBuf,
        /// Output PDF path.
        #[arg(short, long, default_value = "out.pdf")]
        output: PathBuf,
    },
    /// Print page count and page sizes of a PDF.
    Info {
        /// Path to the PDF.
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Compose { plan, output } => compose(&plan, &output),
        Command::Info { file } => info_command(&file),
    }
}

fn compose(plan_path: &Path, output: &Path) -> Result<()> {
    let parsed: ComposePlan = serde_json::from_slice(&std::fs::read(plan_path)?)?;

    let mut config = SessionConfig::default();
    if let Some(scale) = parsed.render_scale {
        config.render_scale = scale;
    }
    config.font_path = parsed.font.clone();

    let renderer = Renderer::from_config(&config)?;
    let mut decoder = MediaBoxDecoder::new();
    let store = plan::build_store(&parsed, &mut decoder, config.render_scale)?;
    let bytes = export_document(&store, &renderer, PdfAssembler::new())?;
    std::fs::write(output, &bytes)?;

    info!(pages = store.len(), output = %output.display(), "document exported");
    Ok(())
}

fn info_command(file: &Path) -> Result<()> {
    let bytes: Arc<[u8]> = std::fs::read(file)?.into();
    let mut decoder = MediaBoxDecoder::new();
    let count = decoder.page_count(&bytes)?;
    println!("{}: {} pages", file.display(), count);
    for number in 1..=count {
        let page = decoder.render_page(&bytes, number, 1.0)?;
        println!(
            "  page {}: {:.1} x {:.1} pt",
            number, page.native_width, page.native_height
        );
    }
    Ok(())
}
