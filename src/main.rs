// Copyright 2026 Pagepress Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pagepress::cli;

#[derive(Parser)]
#[command(
    name = "pagepress",
    about = "Pagepress — stabilize dynamic course pages and export them as PDFs",
    version,
    after_help = "Run 'pagepress <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export one PDF per row of a CSV input file
    Export {
        /// Input CSV with a URL column and an optional name column
        input: PathBuf,
        /// Directory the PDFs are written to
        #[arg(long, default_value = "pdfs")]
        output_dir: PathBuf,
        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,
        /// Hard cap on scroll-convergence iterations
        #[arg(long, default_value = "50")]
        max_scrolls: u32,
    },
    /// Export a single page by URL
    Single {
        /// Page URL
        url: String,
        /// Display name used in the output filename
        #[arg(long)]
        name: Option<String>,
        /// Directory the PDF is written to
        #[arg(long, default_value = "pdfs")]
        output_dir: PathBuf,
        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,
        /// Hard cap on scroll-convergence iterations
        #[arg(long, default_value = "50")]
        max_scrolls: u32,
    },
    /// Check environment and diagnose issues
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("pagepress={default_level}"))),
        )
        .init();

    match cli.command {
        Commands::Export {
            input,
            output_dir,
            headed,
            max_scrolls,
        } => cli::export_cmd::run(&input, &output_dir, headed, max_scrolls).await,
        Commands::Single {
            url,
            name,
            output_dir,
            headed,
            max_scrolls,
        } => {
            cli::single_cmd::run(&url, name.as_deref(), &output_dir, headed, max_scrolls).await
        }
        Commands::Doctor => cli::doctor::run().await,
    }
}
