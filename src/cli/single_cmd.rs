//! `pagepress single <url>` — export one page without an input file.

use crate::batch::{self, InputRow, PipelineConfig};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use anyhow::Result;
use std::path::Path;

pub async fn run(
    url: &str,
    name: Option<&str>,
    output_dir: &Path,
    headed: bool,
    max_scrolls: u32,
) -> Result<()> {
    let rows = vec![InputRow {
        url: url.to_string(),
        name: name.map(String::from),
    }];

    let renderer = ChromiumRenderer::launch(headed).await?;
    let config = PipelineConfig {
        max_scroll_iterations: max_scrolls,
        ..PipelineConfig::default()
    };

    let summary = batch::run_batch(&renderer, &rows, output_dir, &config).await;
    renderer.shutdown().await?;
    let summary = summary?;

    if summary.exported == 1 {
        println!("Exported to {}", output_dir.display());
    } else {
        anyhow::bail!("export failed for {url}");
    }
    Ok(())
}
