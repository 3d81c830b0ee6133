//! Section expansion orchestration.
//!
//! Navigates to a logical page section by URL fragment, enumerates
//! accordion-style controls, filters them through the classifier, and drives
//! the interaction primitive to expand each non-excluded one exactly once.
//! Already-expanded elements are skipped, so re-entry is idempotent. A
//! section that yields zero expandable candidates falls back to an alternate
//! fragment once.

use super::classify::{
    classify, scan_script, Classification, ElementSnapshot, ExclusionVocabulary, ExpandedState,
};
use super::interact::{read_expanded_state, safe_interact, ElementTarget, InteractOptions};
use super::suppress::SuppressionEngine;
use crate::session::PageSession;
use anyhow::Result;

/// Per-element outcome of a section expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionOutcome {
    /// One net transition from collapsed to expanded.
    Expanded,
    /// Already expanded at interaction time; left untouched.
    AlreadyExpanded,
    /// Classifier excluded it; no interaction was attempted.
    SkippedExcluded,
    /// Interaction reported failure; remaining candidates still run.
    FailedInteraction,
}

/// Outcome plus a human-readable element label, aggregated per section.
#[derive(Debug, Clone)]
pub struct ExpansionResult {
    pub label: String,
    pub outcome: ExpansionOutcome,
}

/// Count results with a given outcome.
pub fn count_outcome(results: &[ExpansionResult], outcome: ExpansionOutcome) -> usize {
    results.iter().filter(|r| r.outcome == outcome).count()
}

/// A logical page section addressed by URL fragment, with an optional
/// fallback fragment tried when the primary yields no candidates.
#[derive(Debug, Clone)]
pub struct SectionAnchor {
    pub primary: String,
    pub fallback: Option<String>,
}

impl SectionAnchor {
    pub fn new(primary: &str) -> Self {
        Self {
            primary: primary.to_string(),
            fallback: None,
        }
    }

    pub fn with_fallback(primary: &str, fallback: &str) -> Self {
        Self {
            primary: primary.to_string(),
            fallback: Some(fallback.to_string()),
        }
    }
}

/// Drives expansion of one page section.
pub struct SectionExpander {
    vocab: ExclusionVocabulary,
    /// Accordion-style interactive elements.
    accordion_selector: String,
    nav_timeout_ms: u64,
    /// Settle after fragment navigation before scanning.
    nav_settle_ms: u64,
    /// Bounded incremental scrolling after expansion, to force
    /// expansion-triggered lazy content to render.
    post_scroll_iterations: u32,
    post_scroll_settle_ms: u64,
    interact: InteractOptions,
}

impl Default for SectionExpander {
    fn default() -> Self {
        Self {
            vocab: ExclusionVocabulary::default(),
            accordion_selector: "button[aria-expanded]".to_string(),
            nav_timeout_ms: 30_000,
            nav_settle_ms: 2000,
            post_scroll_iterations: 3,
            post_scroll_settle_ms: 400,
            interact: InteractOptions::default(),
        }
    }
}

impl SectionExpander {
    pub fn new(vocab: ExclusionVocabulary) -> Self {
        Self {
            vocab,
            ..Self::default()
        }
    }

    #[cfg(test)]
    fn fast(vocab: ExclusionVocabulary) -> Self {
        Self {
            vocab,
            nav_settle_ms: 1,
            post_scroll_settle_ms: 1,
            interact: InteractOptions {
                timeout_ms: 50,
                settle_ms: 1,
                scroll: true,
                force: false,
            },
            ..Self::default()
        }
    }

    /// Expand every non-excluded accordion in the section, then run the
    /// truncation pass. Returns per-element results.
    pub async fn expand_section(
        &self,
        session: &mut PageSession,
        engine: &SuppressionEngine,
        base_url: &str,
        anchor: &SectionAnchor,
    ) -> Result<Vec<ExpansionResult>> {
        let mut results = self
            .expand_at(session, engine, base_url, &anchor.primary)
            .await?;

        // Zero non-excluded candidates: the section may live under an
        // alternate fragment. One fallback attempt only.
        let expandable = results
            .iter()
            .any(|r| r.outcome != ExpansionOutcome::SkippedExcluded);
        if !expandable {
            if let Some(fallback) = &anchor.fallback {
                tracing::info!(
                    primary = %anchor.primary,
                    fallback = %fallback,
                    "no expandable candidates, trying fallback anchor"
                );
                results = self.expand_at(session, engine, base_url, fallback).await?;
            }
        }

        // Force expansion-triggered lazy content to render, then expand
        // truncation controls revealed by it.
        self.nudge_lazy_content(session).await;
        let mut truncation = self.expand_truncation_controls(session, engine).await;
        results.append(&mut truncation);

        tracing::info!(
            anchor = %anchor.primary,
            expanded = count_outcome(&results, ExpansionOutcome::Expanded),
            already = count_outcome(&results, ExpansionOutcome::AlreadyExpanded),
            skipped = count_outcome(&results, ExpansionOutcome::SkippedExcluded),
            failed = count_outcome(&results, ExpansionOutcome::FailedInteraction),
            "section expansion complete"
        );
        Ok(results)
    }

    async fn expand_at(
        &self,
        session: &mut PageSession,
        engine: &SuppressionEngine,
        base_url: &str,
        fragment: &str,
    ) -> Result<Vec<ExpansionResult>> {
        let url = format!("{}#{}", base_url.trim_end_matches('/'), fragment);
        session.navigate(&url, self.nav_timeout_ms).await?;
        session.settle(self.nav_settle_ms).await;

        // Synchronous sweep so we never interact through an overlay.
        engine.sweep_now(session).await;

        let snapshots = self.scan(session, &self.accordion_selector).await?;
        tracing::debug!(fragment, count = snapshots.len(), "scanned accordion candidates");

        let mut results = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let label = snapshot.display_label();
            if classify(&snapshot, &self.vocab) == Classification::Excluded {
                tracing::debug!(%label, "skipping excluded element");
                results.push(ExpansionResult {
                    label,
                    outcome: ExpansionOutcome::SkippedExcluded,
                });
                continue;
            }

            let mut target = ElementTarget::new(self.accordion_selector.clone(), snapshot.index);
            if let Some(marker) = snapshot.identity() {
                target = target.with_guard(marker);
            }

            // Re-read the expanded state fresh: prior expansions can shift
            // attribute state across the whole accordion group.
            let outcome = match read_expanded_state(session, &target).await {
                ExpandedState::Expanded => ExpansionOutcome::AlreadyExpanded,
                ExpandedState::Collapsed | ExpandedState::Unknown => {
                    engine.sweep_now(session).await;
                    if safe_interact(session, &target, &self.interact).await {
                        ExpansionOutcome::Expanded
                    } else {
                        ExpansionOutcome::FailedInteraction
                    }
                }
            };
            results.push(ExpansionResult { label, outcome });
        }
        Ok(results)
    }

    async fn scan(&self, session: &PageSession, selector: &str) -> Result<Vec<ElementSnapshot>> {
        let value = session.eval(&scan_script(selector)).await?;
        let items = value.as_array().cloned().unwrap_or_default();
        Ok(items
            .into_iter()
            .filter_map(ElementSnapshot::from_scan_value)
            .collect())
    }

    async fn nudge_lazy_content(&self, session: &PageSession) {
        for _ in 0..self.post_scroll_iterations {
            session
                .eval_quiet("window.scrollBy(0, window.innerHeight * 0.5)")
                .await;
            session.settle(self.post_scroll_settle_ms).await;
        }
    }

    /// Secondary pass: expand truncation controls ("read more" style
    /// elements), filtered through the classifier like everything else.
    async fn expand_truncation_controls(
        &self,
        session: &PageSession,
        engine: &SuppressionEngine,
    ) -> Vec<ExpansionResult> {
        let value = match session.eval(&truncation_scan_script()).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("truncation scan failed: {e:#}");
                return Vec::new();
            }
        };
        let snapshots: Vec<ElementSnapshot> = value
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(ElementSnapshot::from_scan_value)
            .collect();

        let mut results = Vec::new();
        for snapshot in snapshots {
            let label = snapshot.display_label();
            if classify(&snapshot, &self.vocab) == Classification::Excluded {
                results.push(ExpansionResult {
                    label,
                    outcome: ExpansionOutcome::SkippedExcluded,
                });
                continue;
            }
            engine.sweep_now(session).await;
            // Truncation controls remove themselves when clicked, shifting
            // every later index; the guard keeps a drifted slot unclickable.
            let mut target = ElementTarget::new("button", snapshot.index);
            if let Some(marker) = snapshot.identity() {
                target = target.with_guard(marker);
            }
            let outcome = if safe_interact(session, &target, &self.interact).await {
                ExpansionOutcome::Expanded
            } else {
                ExpansionOutcome::FailedInteraction
            };
            results.push(ExpansionResult { label, outcome });
        }
        results
    }
}

/// Scan for truncation controls by visible text.
fn truncation_scan_script() -> String {
    r#"(() => {
    const pattern = /read more|show more|view all/i;
    const snaps = [];
    document.querySelectorAll('button').forEach((el, index) => {
        const text = (el.textContent || '').trim();
        if (!pattern.test(text)) { return; }
        const container = el.closest('section, [data-testid], div[class]');
        snaps.push({
            index: index,
            label: el.getAttribute('aria-label') || '',
            role: 'button',
            classes: el.getAttribute('class') || '',
            markers: [
                el.getAttribute('data-e2e') || '',
                el.getAttribute('data-testid') || '',
                el.getAttribute('data-track') || ''
            ].join(' ').trim(),
            text: text.slice(0, 200),
            ancestorText: container ? (container.textContent || '').trim().slice(0, 200) : '',
            expandedAttr: el.getAttribute('aria-expanded')
        });
    });
    return snaps;
}})()"#
        .to_string()
}
