//! Scroll convergence detection.
//!
//! Repeatedly advances the scroll position until further scrolling produces
//! no new content: either the viewport bottom reaches the document height
//! (within a threshold) or the height stops growing for one full iteration.
//! A hard iteration cap bounds non-termination; hitting the cap is a normal
//! exit, not an error. Height decreases (suppression removing content) are
//! tolerated and do not reset the iteration counter.

use super::suppress::SuppressionEngine;
use crate::session::PageSession;
use anyhow::Result;
use serde::Deserialize;

/// Why the scroll loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollStop {
    /// Scroll offset plus viewport height reached document height.
    AtBottom,
    /// Document height unchanged for one full iteration.
    NoGrowth,
    /// Hard iteration cap reached.
    IterationCap,
}

/// Summary of one scroll-to-exhaustion run.
#[derive(Debug, Clone)]
pub struct ScrollSummary {
    pub iterations: u32,
    pub final_height: f64,
    pub stop: ScrollStop,
}

#[derive(Debug, Deserialize)]
struct ScrollMetrics {
    /// `window.pageYOffset + window.innerHeight`.
    offset: f64,
    /// `document.body.scrollHeight`.
    height: f64,
}

const METRICS_SCRIPT: &str = r#"(() => ({
    offset: window.pageYOffset + window.innerHeight,
    height: document.body.scrollHeight
}))()"#;

/// Advances scrolling until content stops growing.
pub struct ConvergenceScroller {
    /// Fraction of viewport height advanced per iteration.
    pub step_fraction: f64,
    /// Settle interval between advance and measurement.
    pub settle_ms: u64,
    /// Run a suppression sweep every k-th iteration to bound cost.
    pub sweep_every: u32,
    /// "At bottom" threshold in CSS pixels.
    pub bottom_epsilon: f64,
}

impl Default for ConvergenceScroller {
    fn default() -> Self {
        Self {
            step_fraction: 0.8,
            settle_ms: 400,
            sweep_every: 5,
            bottom_epsilon: 100.0,
        }
    }
}

impl ConvergenceScroller {
    /// Scroll until exhaustion or `max_iterations`.
    pub async fn scroll_to_exhaustion(
        &self,
        session: &PageSession,
        engine: &SuppressionEngine,
        max_iterations: u32,
    ) -> Result<ScrollSummary> {
        let mut last_height: Option<f64> = None;
        let mut iterations = 0;
        let mut final_height = 0.0;
        let mut stop = ScrollStop::IterationCap;

        while iterations < max_iterations {
            let advance = format!(
                "window.scrollBy(0, window.innerHeight * {})",
                self.step_fraction
            );
            session.eval_quiet(&advance).await;
            session.settle(self.settle_ms).await;

            if self.sweep_every > 0 && iterations % self.sweep_every == 0 {
                engine.sweep_now(session).await;
            }

            iterations += 1;

            let metrics: ScrollMetrics = session.eval_json(METRICS_SCRIPT).await?;
            final_height = metrics.height;

            if metrics.offset >= metrics.height - self.bottom_epsilon {
                stop = ScrollStop::AtBottom;
                break;
            }
            if let Some(prev) = last_height {
                // Growth test. A decrease means suppression removed content;
                // tolerated, the counter does not reset.
                if (metrics.height - prev).abs() < f64::EPSILON {
                    stop = ScrollStop::NoGrowth;
                    break;
                }
            }
            last_height = Some(metrics.height);
        }

        // Correct for step rounding with one absolute scroll to the bottom.
        session
            .eval_quiet("window.scrollTo(0, document.body.scrollHeight)")
            .await;

        tracing::debug!(iterations, final_height, ?stop, "scroll converged");
        Ok(ScrollSummary {
            iterations,
            final_height,
            stop,
        })
    }
}
