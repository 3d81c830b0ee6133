//! Batch driver: tabular input rows in, one exported PDF per row out.
//!
//! One `PageSession` is processed to completion before the next begins.
//! Propagation policy: failures local to one element or one section never
//! cross the section boundary; only navigation failure and export failure
//! cross the row boundary, and even those just move the batch on to the
//! next row. No condition here is fatal to the whole batch.

use crate::export::export_pdf;
use crate::renderer::{PdfOptions, Renderer};
use crate::session::PageSession;
use crate::stabilize::expand::{SectionAnchor, SectionExpander};
use crate::stabilize::normalize::LayoutNormalizer;
use crate::stabilize::ruleset::SuppressionRuleSet;
use crate::stabilize::scroll::ConvergenceScroller;
use crate::stabilize::suppress::SuppressionEngine;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures that cross the row boundary.
#[derive(Debug, Error)]
pub enum RowFailure {
    #[error("navigation failed: {0}")]
    Navigation(#[source] anyhow::Error),
    #[error("export failed: {0}")]
    Export(#[source] anyhow::Error),
}

/// One input row from the tabular source.
#[derive(Debug, Clone)]
pub struct InputRow {
    pub url: String,
    pub name: Option<String>,
}

/// Accepted header variants for the URL column.
const URL_HEADERS: &[&str] = &[
    "url",
    "course_url",
    "course url",
    "link",
    "course_link",
    "course link",
    "coursera_url",
    "coursera url",
];

/// Accepted header variants for the optional display-name column.
const NAME_HEADERS: &[&str] = &[
    "name",
    "course_name",
    "course name",
    "title",
    "course_title",
    "course title",
    "coursera course name",
];

fn find_column(headers: &csv::StringRecord, variants: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| variants.contains(&h.trim().to_lowercase().as_str()))
}

/// Read input rows from a CSV file, detecting the URL and name columns from
/// a set of accepted header variants. Rows are returned as-is; empty URLs
/// are the driver's concern, not the reader's.
pub fn read_rows(path: &Path) -> Result<Vec<InputRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot open input file {}", path.display()))?;
    let headers = reader.headers().context("input file has no header row")?.clone();

    let url_idx = find_column(&headers, URL_HEADERS).context(
        "could not detect URL column; name it one of: url, course_url, link",
    )?;
    let name_idx = find_column(&headers, NAME_HEADERS);
    if name_idx.is_none() {
        tracing::warn!("no display-name column detected; filenames will use on-page titles");
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("malformed CSV record")?;
        let url = record.get(url_idx).unwrap_or("").trim().to_string();
        let name = name_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        rows.push(InputRow { url, name });
    }
    Ok(rows)
}

/// Tunables for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub nav_timeout_ms: u64,
    /// Settle after the initial page load before suppression starts.
    pub initial_settle_ms: u64,
    pub max_scroll_iterations: u32,
    pub pdf: PdfOptions,
    /// Logical sections expanded per row, in order.
    pub anchors: Vec<SectionAnchor>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            nav_timeout_ms: 60_000,
            initial_settle_ms: 3000,
            max_scroll_iterations: 50,
            pdf: PdfOptions::default(),
            anchors: vec![
                SectionAnchor::new("about"),
                SectionAnchor::with_fallback("modules", "courses"),
            ],
        }
    }
}

/// Aggregated outcome of a batch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchSummary {
    pub exported: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Run the full stabilization pipeline for one row and export the PDF.
pub async fn process_row(
    session: &mut PageSession,
    url: &str,
    name: Option<&str>,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<PathBuf, RowFailure> {
    session
        .navigate(url, config.nav_timeout_ms)
        .await
        .map_err(RowFailure::Navigation)?;
    session.settle(config.initial_settle_ms).await;

    let mut engine = SuppressionEngine::new(SuppressionRuleSet::default());
    engine.activate(session).await;

    let expander = SectionExpander::default();
    for anchor in &config.anchors {
        if let Err(e) = expander.expand_section(session, &engine, url, anchor).await {
            tracing::warn!(anchor = %anchor.primary, "section expansion failed: {e:#}");
        }
    }

    let scroller = ConvergenceScroller::default();
    match scroller
        .scroll_to_exhaustion(session, &engine, config.max_scroll_iterations)
        .await
    {
        Ok(summary) => tracing::info!(
            iterations = summary.iterations,
            stop = ?summary.stop,
            "lazy content exhausted"
        ),
        Err(e) => tracing::warn!("scroll convergence failed: {e:#}"),
    }

    // The background sweep stops before the capture; the normalizer runs its
    // own final synchronous sweep.
    engine.deactivate(session).await;

    let normalizer = LayoutNormalizer::default();
    if let Err(e) = normalizer.normalize_for_export(session, &engine).await {
        tracing::warn!("layout normalization failed: {e:#}");
    }

    export_pdf(session, output_dir, name, &config.pdf)
        .await
        .map_err(RowFailure::Export)
}

/// Drive every input row through the pipeline, one session at a time.
pub async fn run_batch(
    renderer: &dyn Renderer,
    rows: &[InputRow],
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    for (i, row) in rows.iter().enumerate() {
        if row.url.is_empty() || row.url.eq_ignore_ascii_case("nan") {
            tracing::info!(row = i + 1, "skipping row with empty URL");
            summary.skipped += 1;
            continue;
        }

        tracing::info!(row = i + 1, total = rows.len(), url = %row.url, "processing row");
        let context = match renderer.new_context().await {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(url = %row.url, "failed to open a browser tab: {e:#}");
                summary.failed += 1;
                continue;
            }
        };
        let mut session = PageSession::new(context);

        let outcome = process_row(
            &mut session,
            &row.url,
            row.name.as_deref(),
            output_dir,
            config,
        )
        .await;

        // Teardown on every exit path, so tabs never leak across the batch.
        if let Err(e) = session.close().await {
            tracing::warn!("failed to close session: {e:#}");
        }

        match outcome {
            Ok(path) => {
                tracing::info!(path = %path.display(), "row exported");
                summary.exported += 1;
            }
            Err(e) => {
                tracing::warn!(url = %row.url, "row failed: {e}");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{NavigationResult, RenderContext};
    use crate::stabilize::testctx::ScriptedContext;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_rows_detects_header_variants() {
        let file = write_csv(
            "Course URL,Course Name\n\
             https://example.com/learn/a,Course A\n\
             https://example.com/learn/b,\n",
        );
        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].url, "https://example.com/learn/a");
        assert_eq!(rows[0].name.as_deref(), Some("Course A"));
        assert_eq!(rows[1].name, None);
    }

    #[test]
    fn test_read_rows_accepts_link_and_title() {
        let file = write_csv("Link,Title\nhttps://example.com/learn/x,X\n");
        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows[0].url, "https://example.com/learn/x");
        assert_eq!(rows[0].name.as_deref(), Some("X"));
    }

    #[test]
    fn test_read_rows_rejects_missing_url_column() {
        let file = write_csv("foo,bar\n1,2\n");
        let err = read_rows(file.path()).unwrap_err();
        assert!(err.to_string().contains("URL column"));
    }

    /// Handler for a well-behaved page with no accordions: every pipeline
    /// stage succeeds and the scroller converges immediately.
    fn benign_page(script: &str) -> anyhow::Result<serde_json::Value> {
        if script.contains("protected_markers") {
            return Ok(serde_json::json!(0));
        }
        if script.contains("read more|show more") || script.contains("ancestorText") {
            return Ok(serde_json::json!([]));
        }
        if script.contains("pageYOffset") {
            return Ok(serde_json::json!({ "offset": 1000.0, "height": 900.0 }));
        }
        if script.contains("!== null") {
            return Ok(serde_json::json!(true));
        }
        if script.contains("querySelector('h1')") {
            return Ok(serde_json::json!("Benign Course"));
        }
        Ok(serde_json::json!(true))
    }

    struct FakeRenderer {
        created: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedContext::new(benign_page)))
        }
        async fn shutdown(&self) -> Result<()> {
            Ok(())
        }
        fn active_contexts(&self) -> usize {
            0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_url_row_is_skipped_and_next_row_processed() {
        let dir = tempfile::tempdir().unwrap();
        let created = Arc::new(AtomicUsize::new(0));
        let renderer = FakeRenderer {
            created: Arc::clone(&created),
        };
        let rows = vec![
            InputRow {
                url: String::new(),
                name: None,
            },
            InputRow {
                url: "https://example.com/learn/demo".to_string(),
                name: Some("Demo".to_string()),
            },
        ];

        let summary = run_batch(&renderer, &rows, dir.path(), &PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.exported, 1);
        assert_eq!(summary.failed, 0);
        // A session was created only for the row with a URL.
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(dir.path().join("Demo_demo.pdf").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tab_open_failure_fails_row_not_batch() {
        // The first tab fails to open; the batch moves on and the second
        // row still exports.
        struct FlakyRenderer {
            calls: AtomicUsize,
        }
        #[async_trait]
        impl Renderer for FlakyRenderer {
            async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("browser target crashed");
                }
                Ok(Box::new(ScriptedContext::new(benign_page)))
            }
            async fn shutdown(&self) -> Result<()> {
                Ok(())
            }
            fn active_contexts(&self) -> usize {
                0
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let renderer = FlakyRenderer {
            calls: AtomicUsize::new(0),
        };
        let rows = vec![
            InputRow {
                url: "https://example.com/learn/first".to_string(),
                name: Some("First".to_string()),
            },
            InputRow {
                url: "https://example.com/learn/second".to_string(),
                name: Some("Second".to_string()),
            },
        ];

        let summary = run_batch(&renderer, &rows, dir.path(), &PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.exported, 1);
        assert!(dir.path().join("Second_second.pdf").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_failure_abandons_row_but_not_batch() {
        struct FailingNavContext;
        #[async_trait]
        impl RenderContext for FailingNavContext {
            async fn navigate(&mut self, _url: &str, _t: u64) -> Result<NavigationResult> {
                anyhow::bail!("net::ERR_NAME_NOT_RESOLVED")
            }
            async fn execute_js(&self, _script: &str) -> Result<serde_json::Value> {
                Ok(serde_json::Value::Null)
            }
            async fn get_url(&self) -> Result<String> {
                Ok(String::new())
            }
            async fn print_pdf(&self, _o: &PdfOptions) -> Result<Vec<u8>> {
                anyhow::bail!("unreachable")
            }
            async fn close(self: Box<Self>) -> Result<()> {
                Ok(())
            }
        }
        struct FailingRenderer;
        #[async_trait]
        impl Renderer for FailingRenderer {
            async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
                Ok(Box::new(FailingNavContext))
            }
            async fn shutdown(&self) -> Result<()> {
                Ok(())
            }
            fn active_contexts(&self) -> usize {
                0
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            InputRow {
                url: "https://unreachable.invalid/x".to_string(),
                name: None,
            },
            InputRow {
                url: "https://unreachable.invalid/y".to_string(),
                name: None,
            },
        ];
        let summary = run_batch(&FailingRenderer, &rows, dir.path(), &PipelineConfig::default())
            .await
            .unwrap();
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.exported, 0);
    }
}
