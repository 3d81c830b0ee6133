//! PDF export: filename derivation and atomic artifact writing.
//!
//! The filename is the sanitized display name (falling back to the on-page
//! title) joined with a slug from the URL's final path segment, bounded in
//! length. The PDF is written through a `.part` file and renamed into place,
//! so a failed render never leaves a partial artifact under the final name.

use crate::renderer::PdfOptions;
use crate::session::PageSession;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::Instant;

/// Selector that must appear before printing; its absence means the page
/// never rendered its primary content.
const CONTENT_SELECTOR: &str = "main, article, [data-testid*=\"main\"], .content";

const CONTENT_WAIT_MS: u64 = 10_000;
const CONTENT_POLL_MS: u64 = 250;

/// Pause before the render call so the normalized layout finishes painting.
const PRE_RENDER_SETTLE_MS: u64 = 1500;

/// Maximum filename stem length; the `.pdf` extension always survives.
const MAX_STEM_LEN: usize = 192;

fn illegal_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid pattern"))
}

/// Replace filesystem-illegal characters with underscores.
pub fn sanitize_component(raw: &str) -> String {
    illegal_chars().replace_all(raw.trim(), "_").to_string()
}

/// The URL's final non-empty path segment, query stripped.
pub fn url_slug(raw_url: &str) -> String {
    url::Url::parse(raw_url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(String::from))
        })
        .filter(|s| !s.is_empty())
        .map(|s| sanitize_component(&s))
        .unwrap_or_else(|| "page".to_string())
}

/// Derive the output filename from the optional display name, the on-page
/// title, and the target URL.
pub fn derive_filename(display_name: Option<&str>, page_title: Option<&str>, url: &str) -> String {
    let name = display_name
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| page_title.map(str::trim).filter(|s| !s.is_empty()))
        .unwrap_or("Course");
    let stem = format!("{}_{}", sanitize_component(name), url_slug(url));
    let stem: String = stem.chars().take(MAX_STEM_LEN).collect();
    format!("{stem}.pdf")
}

/// Extract the on-page title (first `h1`), used when no display name was
/// provided in the input row.
pub async fn extract_page_title(session: &PageSession) -> Option<String> {
    let script = r#"(() => {
    const h1 = document.querySelector('h1');
    return h1 ? (h1.textContent || '').trim() : null;
})()"#;
    session
        .eval_quiet(script)
        .await
        .and_then(|v| v.as_str().map(String::from))
        .filter(|s| !s.is_empty())
}

/// Poll until the primary content selector resolves, bounded.
async fn wait_for_content(session: &PageSession, timeout_ms: u64) -> bool {
    let script = format!(
        "document.querySelector('{}') !== null",
        crate::stabilize::interact::sanitize_js_string(CONTENT_SELECTOR)
    );
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if let Some(v) = session.eval_quiet(&script).await {
            if v.as_bool().unwrap_or(false) {
                return true;
            }
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(CONTENT_POLL_MS)).await;
    }
}

/// Render the stabilized page to a PDF file in `output_dir`.
///
/// Fails if the primary content selector never appears or the render call
/// throws; in both cases nothing is left under the final filename.
pub async fn export_pdf(
    session: &PageSession,
    output_dir: &Path,
    display_name: Option<&str>,
    options: &PdfOptions,
) -> Result<PathBuf> {
    if !wait_for_content(session, CONTENT_WAIT_MS).await {
        bail!("primary content selector never appeared; refusing to export a blank document");
    }

    let title = extract_page_title(session).await;
    let filename = derive_filename(display_name, title.as_deref(), session.url());

    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    session.settle(PRE_RENDER_SETTLE_MS).await;

    let data = session.context().print_pdf(options).await?;

    let final_path = output_dir.join(&filename);
    let part_path = output_dir.join(format!("{filename}.part"));

    let write = async {
        tokio::fs::write(&part_path, &data)
            .await
            .with_context(|| format!("failed to write {}", part_path.display()))?;
        tokio::fs::rename(&part_path, &final_path)
            .await
            .with_context(|| format!("failed to move artifact into {}", final_path.display()))
    };
    if let Err(e) = write.await {
        let _ = tokio::fs::remove_file(&part_path).await;
        return Err(e);
    }

    tracing::info!(path = %final_path.display(), bytes = data.len(), "exported PDF");
    Ok(final_path)
}
