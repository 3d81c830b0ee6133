//! Continuous overlay suppression.
//!
//! Installs a page-side sweep that removes interstitial overlays (promotional
//! modals, cookie walls, high z-index backdrops) while the rest of the
//! pipeline interacts with the page. The sweep runs once on activation, again
//! whenever a `MutationObserver` sees the subtree change, and on a backup
//! interval timer for mutations the observer misses (same-node attribute
//! churn). Activation and deactivation are symmetric and idempotent.
//!
//! Failure policy: a failed sweep is swallowed and logged; suppression must
//! never abort the pipeline.

use super::ruleset::SuppressionRuleSet;
use crate::session::PageSession;

/// Sweep function body. Applied idempotently: a second run over the same DOM
/// state removes nothing new.
const SWEEP_FN: &str = r#"(function() {
    const rules = __RULES__;
    let removed = 0;
    const lower = (s) => (s || '').toLowerCase();
    const isProtected = (el) => {
        const text = lower(el.textContent);
        const cls = lower(el.getAttribute && el.getAttribute('class'));
        return rules.protected_markers.some(m => text.includes(m) || cls.includes(m));
    };
    const drop = (el) => { try { el.remove(); removed += 1; } catch (e) {} };

    // Promotional and ad containers go unconditionally.
    for (const sel of rules.promo_selectors) {
        try { document.querySelectorAll(sel).forEach(drop); } catch (e) {}
    }

    // Generic dialogs and modals, unless their text carries a protected marker.
    for (const sel of rules.dialog_selectors) {
        try {
            document.querySelectorAll(sel).forEach(el => {
                if (!isProtected(el)) drop(el);
            });
        } catch (e) {}
    }

    // Positioned nodes above the z-index threshold are overlays; hinted class
    // names lower the bar.
    try {
        document.querySelectorAll('*').forEach(el => {
            const style = window.getComputedStyle(el);
            if (style.position !== 'fixed' && style.position !== 'absolute') return;
            const z = parseInt(style.zIndex, 10);
            if (isNaN(z)) return;
            const cls = lower(el.getAttribute('class'));
            const hinted = rules.overlay_class_hints.some(h => cls.includes(h));
            if ((z > rules.z_index_threshold ||
                 (z > rules.z_index_hint_threshold && hinted)) && !isProtected(el)) {
                drop(el);
            }
        });
    } catch (e) {}

    // Fixed or sticky notification banners.
    for (const sel of rules.banner_selectors) {
        try {
            document.querySelectorAll(sel).forEach(el => {
                const style = window.getComputedStyle(el);
                if ((style.position === 'fixed' || style.position === 'sticky') &&
                    !isProtected(el)) {
                    drop(el);
                }
            });
        } catch (e) {}
    }

    // Cookie consent, best effort and non-blocking.
    for (const sel of rules.cookie_selectors) {
        try {
            const btn = document.querySelector(sel);
            if (btn) btn.click();
        } catch (e) {}
    }

    // Undo any scroll lock a removed modal left behind.
    try {
        document.body.style.overflow = 'visible';
        document.body.style.position = 'static';
        document.documentElement.style.overflow = 'visible';
    } catch (e) {}

    return removed;
})"#;

fn sweep_fn(rules: &SuppressionRuleSet) -> String {
    SWEEP_FN.replace("__RULES__", &rules.to_js_literal())
}

/// One-shot sweep, returns the number of removed nodes.
pub fn sweep_script(rules: &SuppressionRuleSet) -> String {
    format!("{}()", sweep_fn(rules))
}

/// Install the continuous sweep: guarded handle, debounced observer, backup
/// interval timer.
pub fn install_script(rules: &SuppressionRuleSet, interval_ms: u64, debounce_ms: u64) -> String {
    format!(
        r#"(() => {{
    if (window.__pagepress) {{ return 'already-active'; }}
    const sweep = {sweep};
    const run = () => {{ try {{ sweep(); }} catch (e) {{}} }};
    run();
    let pending = null;
    const observer = new MutationObserver(() => {{
        if (pending) clearTimeout(pending);
        pending = setTimeout(run, {debounce_ms});
    }});
    observer.observe(document.documentElement, {{
        childList: true,
        subtree: true,
        attributes: true
    }});
    const timer = setInterval(run, {interval_ms});
    window.__pagepress = {{ observer: observer, timer: timer }};
    return 'activated';
}})()"#,
        sweep = sweep_fn(rules),
    )
}

/// Tear down the observer and timer. Safe to run when nothing is installed.
pub fn teardown_script() -> &'static str {
    r#"(() => {
    const h = window.__pagepress;
    if (!h) { return 'inactive'; }
    try { h.observer.disconnect(); } catch (e) {}
    try { clearInterval(h.timer); } catch (e) {}
    delete window.__pagepress;
    return 'deactivated';
})()"#
}

/// Scheduled background suppression for one page session.
pub struct SuppressionEngine {
    rules: SuppressionRuleSet,
    interval_ms: u64,
    debounce_ms: u64,
    active: bool,
}

impl SuppressionEngine {
    pub fn new(rules: SuppressionRuleSet) -> Self {
        Self {
            rules,
            interval_ms: 2000,
            debounce_ms: 150,
            active: false,
        }
    }

    /// Whether the background sweep is currently installed.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Install the continuous sweep. Idempotent; a failed install is logged
    /// and the session continues without background suppression.
    pub async fn activate(&mut self, session: &PageSession) {
        if self.active {
            return;
        }
        let script = install_script(&self.rules, self.interval_ms, self.debounce_ms);
        match session.eval(&script).await {
            Ok(v) => {
                self.active = true;
                tracing::debug!(result = %v, "suppression activated");
            }
            Err(e) => {
                tracing::warn!("failed to activate suppression: {e:#}");
            }
        }
    }

    /// Disconnect the observer and clear the timer. Idempotent.
    pub async fn deactivate(&mut self, session: &PageSession) {
        if !self.active {
            return;
        }
        self.active = false;
        session.eval_quiet(teardown_script()).await;
        tracing::debug!("suppression deactivated");
    }

    /// Run one synchronous sweep immediately. Used by call sites that need a
    /// guarantee before a screenshot-sensitive action. Returns the number of
    /// nodes removed; errors are swallowed and report zero.
    pub async fn sweep_now(&self, session: &PageSession) -> u64 {
        let removed = session
            .eval_quiet(&sweep_script(&self.rules))
            .await
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        if removed > 0 {
            tracing::debug!(removed, "suppression sweep removed nodes");
        }
        removed
    }
}
