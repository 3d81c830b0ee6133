//! `pagepress export <input.csv>` — batch export from a tabular input file.

use crate::batch::{self, PipelineConfig};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use anyhow::Result;
use std::path::Path;

pub async fn run(
    input: &Path,
    output_dir: &Path,
    headed: bool,
    max_scrolls: u32,
) -> Result<()> {
    let rows = batch::read_rows(input)?;
    if rows.is_empty() {
        println!("Input file has no rows.");
        return Ok(());
    }
    println!("Loaded {} row(s) from {}", rows.len(), input.display());

    let renderer = ChromiumRenderer::launch(headed).await?;
    let config = PipelineConfig {
        max_scroll_iterations: max_scrolls,
        ..PipelineConfig::default()
    };

    let summary = batch::run_batch(&renderer, &rows, output_dir, &config).await;
    renderer.shutdown().await?;
    let summary = summary?;

    println!(
        "Done: {} exported, {} failed, {} skipped → {}",
        summary.exported,
        summary.failed,
        summary.skipped,
        output_dir.display()
    );
    Ok(())
}
