//! Layout normalization for export.
//!
//! One-shot, order-sensitive rewrite that makes a dynamic, overflow-clipped,
//! position-fixed layout safe to paginate. By this stage all legitimate
//! interaction is finished, so any dialog-role node still present is an
//! overlay and is removed unconditionally. The rewrite itself is a single
//! explicit JS pass rather than interleaved ad hoc mutations, so it can be
//! tested against a static DOM fixture independent of browser timing.

use super::suppress::SuppressionEngine;
use crate::session::PageSession;
use anyhow::{Context, Result};

/// The normalization pass, in document order:
/// remove remaining dialogs, flatten fixed/sticky positioning, force
/// collapsed markers open, reveal hidden content, and force primary
/// containers to render fully.
pub const NORMALIZE_SCRIPT: &str = r#"(() => {
    // Remaining dialogs are overlays by definition at this stage.
    document.querySelectorAll('[role="dialog"], [role="alertdialog"]')
        .forEach(el => el.remove());
    document.querySelectorAll('[class*="overlay"], [class*="backdrop"]')
        .forEach(el => el.remove());

    // Fixed and sticky nodes repeat or clip on every paginated surface.
    document.querySelectorAll('*').forEach(el => {
        const style = window.getComputedStyle(el);
        if (style.position === 'fixed' || style.position === 'sticky') {
            el.style.position = 'static';
            el.style.top = 'auto';
            el.style.zIndex = '0';
        }
    });

    // Anything still marked collapsed gets forced open; interaction is
    // finished, the print capture must see every panel.
    document.querySelectorAll('[aria-expanded="false"]').forEach(el => {
        el.setAttribute('aria-expanded', 'true');
    });

    // Reveal content hidden behind collapsed or clipped containers.
    document.querySelectorAll('[aria-hidden="true"]').forEach(el => {
        el.setAttribute('aria-hidden', 'false');
        el.style.display = 'block';
        el.style.visibility = 'visible';
    });
    document.querySelectorAll('main, article, section, .content').forEach(el => {
        el.style.display = 'block';
        el.style.visibility = 'visible';
        el.style.opacity = '1';
        el.style.overflow = 'visible';
        el.style.maxHeight = 'none';
    });

    document.body.style.overflow = 'visible';
    document.body.style.height = 'auto';
    return true;
})()"#;

/// Bounded advance-and-return scroll so any remaining lazy containers render
/// before the static capture.
const FINAL_SCROLL_SCRIPT: &str = r#"(() => {
    let pos = 0;
    const height = document.body.scrollHeight;
    while (pos < height) {
        window.scrollBy(0, 500);
        pos += 500;
    }
    window.scrollTo(0, 0);
    return true;
})()"#;

/// Flatten the page layout immediately before export.
pub struct LayoutNormalizer {
    /// Settle after the rewrite, before the final scroll pass.
    pub settle_ms: u64,
}

impl Default for LayoutNormalizer {
    fn default() -> Self {
        Self { settle_ms: 500 }
    }
}

impl LayoutNormalizer {
    pub async fn normalize_for_export(
        &self,
        session: &PageSession,
        engine: &SuppressionEngine,
    ) -> Result<()> {
        // Final synchronous sweep before any rewrite.
        engine.sweep_now(session).await;

        session
            .eval_quiet("window.scrollTo({ top: 0, behavior: 'smooth' })")
            .await;

        session
            .eval(NORMALIZE_SCRIPT)
            .await
            .context("layout normalization pass failed")?;
        session.settle(self.settle_ms).await;

        session
            .eval(FINAL_SCROLL_SCRIPT)
            .await
            .context("final render scroll failed")?;
        session.settle(self.settle_ms).await;

        Ok(())
    }
}
