//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). The pipeline
//! components depend only on `RenderContext`, which keeps them testable
//! against scripted fakes.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// Paper and layout parameters for PDF rendering.
///
/// Defaults to A4 with background graphics, a fixed margin on all four
/// edges, and a sub-100% scale so content does not clip at page edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfOptions {
    /// Paper width in inches.
    pub paper_width: f64,
    /// Paper height in inches.
    pub paper_height: f64,
    /// Top/bottom margin in inches.
    pub margin_vertical: f64,
    /// Left/right margin in inches.
    pub margin_horizontal: f64,
    /// Content scale factor (1.0 = 100%).
    pub scale: f64,
    /// Render background graphics.
    pub print_background: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            // A4
            paper_width: 8.27,
            paper_height: 11.69,
            margin_vertical: 0.4,
            margin_horizontal: 0.5,
            scale: 0.90,
            print_background: true,
        }
    }
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for driving one page.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;
    /// Render the current page to PDF under print media emulation.
    async fn print_pdf(&self, options: &PdfOptions) -> Result<Vec<u8>>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}
