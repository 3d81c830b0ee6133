//! Safe interaction primitive.
//!
//! The only component permitted to originate a user-intent action against the
//! page. `safe_interact` is total: every failure path — detached element,
//! never-visible element, evaluation error, timeout — returns `false` rather
//! than propagating, so callers can walk a list of candidates without one
//! failure aborting the batch. Retries, if any, belong to the caller.
//!
//! Elements are addressed as (selector, index) and re-resolved in the page on
//! every step; a handle held across a suspension point is treated as stale.

use super::classify::ExpandedState;
use crate::session::PageSession;
use std::time::Duration;
use tokio::time::Instant;

/// Address of one element within the live DOM.
///
/// The index is positional and drifts when earlier elements remove
/// themselves; `guard` carries a text marker from scan time that the click
/// script re-checks, so a drifted index can never land on a different
/// element.
#[derive(Debug, Clone)]
pub struct ElementTarget {
    pub selector: String,
    pub index: usize,
    pub guard: Option<String>,
}

impl ElementTarget {
    pub fn new(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
            guard: None,
        }
    }

    /// Require the element's label or text to still contain `marker` at
    /// click time.
    pub fn with_guard(mut self, marker: impl Into<String>) -> Self {
        self.guard = Some(marker.into());
        self
    }

    fn resolve_js(&self) -> String {
        format!(
            "document.querySelectorAll('{}')[{}]",
            sanitize_js_string(&self.selector),
            self.index
        )
    }
}

/// Options for one interaction attempt.
#[derive(Debug, Clone)]
pub struct InteractOptions {
    /// Bound on the visibility wait.
    pub timeout_ms: u64,
    /// Pause after scroll-into-view before clicking.
    pub settle_ms: u64,
    /// Scroll the element into the viewport first.
    pub scroll: bool,
    /// Bypass the visibility gate, for elements obscured by a
    /// to-be-removed overlay.
    pub force: bool,
}

impl Default for InteractOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            settle_ms: 300,
            scroll: true,
            force: false,
        }
    }
}

const VISIBILITY_POLL_MS: u64 = 200;

/// Click the target element. Returns `true` on success; never raises.
pub async fn safe_interact(
    session: &PageSession,
    target: &ElementTarget,
    options: &InteractOptions,
) -> bool {
    let el = target.resolve_js();

    // Visibility gate with bounded wait. `force` skips straight to the click.
    if !options.force {
        let probe = format!(
            r#"(() => {{
    const el = {el};
    if (!el) {{ return {{ found: false, visible: false }}; }}
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    const visible = rect.width > 0 && rect.height > 0 &&
        style.visibility !== 'hidden' && style.display !== 'none';
    return {{ found: true, visible: visible }};
}})()"#
        );

        let deadline = Instant::now() + Duration::from_millis(options.timeout_ms);
        loop {
            let state = match session.eval(&probe).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!("interaction probe failed: {e:#}");
                    return false;
                }
            };
            let found = state.get("found").and_then(|v| v.as_bool()).unwrap_or(false);
            let visible = state
                .get("visible")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if !found {
                return false;
            }
            if visible {
                break;
            }
            if Instant::now() >= deadline {
                tracing::debug!(selector = %target.selector, index = target.index,
                    "element never became visible");
                return false;
            }
            session.settle(VISIBILITY_POLL_MS).await;
        }
    }

    if options.scroll {
        let scroll = format!(
            r#"(() => {{
    const el = {el};
    if (el) {{ el.scrollIntoView({{ block: 'center' }}); }}
}})()"#
        );
        session.eval_quiet(&scroll).await;
        session.settle(options.settle_ms).await;
    }

    // Re-resolve and click. The DOM may have mutated since the probe, so the
    // guard confirms the slot still holds the element that was scanned.
    let guard_check = match target.guard.as_deref() {
        Some(marker) if !marker.is_empty() => format!(
            r#"    const ident = (el.getAttribute('aria-label') || '') + ' ' + (el.textContent || '');
    if (!ident.includes('{}')) {{ return false; }}
"#,
            sanitize_js_string(marker)
        ),
        _ => String::new(),
    };
    let click = format!(
        r#"(() => {{
    const el = {el};
    if (!el) {{ return false; }}
{guard_check}    try {{ el.click(); return true; }} catch (e) {{ return false; }}
}})()"#
    );
    let clicked = match session.eval(&click).await {
        Ok(v) => v.as_bool().unwrap_or(false),
        Err(e) => {
            tracing::debug!("click evaluation failed: {e:#}");
            false
        }
    };
    if clicked {
        session.settle(options.settle_ms).await;
    }
    clicked
}

/// Read the target's `aria-expanded` state fresh from the live DOM.
///
/// Called immediately before each interaction: prior expansions can shift
/// attribute state across a whole accordion group.
pub async fn read_expanded_state(session: &PageSession, target: &ElementTarget) -> ExpandedState {
    let script = format!(
        r#"(() => {{
    const el = {};
    return el ? el.getAttribute('aria-expanded') : null;
}})()"#,
        target.resolve_js()
    );
    match session.eval(&script).await {
        Ok(v) => ExpandedState::from_attr(v.as_str()),
        Err(_) => ExpandedState::Unknown,
    }
}

/// Sanitize a string for safe injection into a JavaScript string literal.
///
/// Escapes every character that could break out of a JS string context.
pub fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stabilize::testctx::ScriptedContext;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn session_with(
        handler: impl Fn(&str) -> anyhow::Result<serde_json::Value> + Send + Sync + 'static,
    ) -> PageSession {
        PageSession::new(Box::new(ScriptedContext::new(handler)))
    }

    fn fast_options() -> InteractOptions {
        InteractOptions {
            timeout_ms: 50,
            settle_ms: 1,
            scroll: true,
            force: false,
        }
    }

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize_js_string("hello"), "hello");
        assert_eq!(sanitize_js_string("it's"), "it\\'s");
        assert_eq!(sanitize_js_string("a\"b"), "a\\\"b");
    }

    #[test]
    fn test_sanitize_blocks_script_breakout() {
        let malicious = r#"</script><script>alert(1)</script>"#;
        let sanitized = sanitize_js_string(malicious);
        assert!(!sanitized.contains("</script>"));
        assert!(sanitized.contains("\\x3c/script\\x3e"));
    }

    #[tokio::test]
    async fn test_interact_never_raises_on_evaluation_errors() {
        // Every evaluation fails: the primitive must report false, not panic.
        let session = session_with(|_| anyhow::bail!("context torn down"));
        let target = ElementTarget::new("button", 0);
        assert!(!safe_interact(&session, &target, &fast_options()).await);
    }

    #[tokio::test]
    async fn test_interact_detached_element_returns_false() {
        let session = session_with(|script| {
            if script.contains("getBoundingClientRect") {
                Ok(serde_json::json!({ "found": false, "visible": false }))
            } else {
                Ok(serde_json::Value::Null)
            }
        });
        let target = ElementTarget::new("button[aria-expanded]", 4);
        assert!(!safe_interact(&session, &target, &fast_options()).await);
    }

    #[tokio::test]
    async fn test_interact_permanently_hidden_times_out_false() {
        let session = session_with(|script| {
            if script.contains("getBoundingClientRect") {
                Ok(serde_json::json!({ "found": true, "visible": false }))
            } else {
                Ok(serde_json::Value::Null)
            }
        });
        let target = ElementTarget::new("button", 0);
        assert!(!safe_interact(&session, &target, &fast_options()).await);
    }

    #[tokio::test]
    async fn test_interact_visible_element_clicks() {
        let session = session_with(|script| {
            if script.contains("getBoundingClientRect") {
                Ok(serde_json::json!({ "found": true, "visible": true }))
            } else if script.contains(".click()") {
                Ok(serde_json::json!(true))
            } else {
                Ok(serde_json::Value::Null)
            }
        });
        let target = ElementTarget::new("button", 2);
        assert!(safe_interact(&session, &target, &fast_options()).await);
    }

    #[tokio::test]
    async fn test_force_bypasses_visibility_gate() {
        // Probe would say hidden, but force goes straight to the click.
        let session = session_with(|script| {
            if script.contains("getBoundingClientRect") {
                Ok(serde_json::json!({ "found": true, "visible": false }))
            } else if script.contains(".click()") {
                Ok(serde_json::json!(true))
            } else {
                Ok(serde_json::Value::Null)
            }
        });
        let target = ElementTarget::new("button", 0);
        let options = InteractOptions {
            force: true,
            ..fast_options()
        };
        assert!(safe_interact(&session, &target, &options).await);
    }

    #[tokio::test]
    async fn test_guarded_click_checks_element_identity() {
        // The click script must re-verify the scan-time text marker; a bare
        // positional click would silently accept a displaced element.
        let saw_guard = Arc::new(AtomicBool::new(false));
        let saw_guard_h = Arc::clone(&saw_guard);
        let session = session_with(move |script| {
            if script.contains("getBoundingClientRect") {
                Ok(serde_json::json!({ "found": true, "visible": true }))
            } else if script.contains("el.click()") {
                saw_guard_h.store(script.contains("includes('Read more')"), Ordering::SeqCst);
                Ok(serde_json::json!(true))
            } else {
                Ok(serde_json::Value::Null)
            }
        });
        let target = ElementTarget::new("button", 0).with_guard("Read more");
        assert!(safe_interact(&session, &target, &fast_options()).await);
        assert!(saw_guard.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_read_expanded_state_fresh() {
        let session = session_with(|script| {
            if script.contains("aria-expanded") {
                Ok(serde_json::json!("true"))
            } else {
                Ok(serde_json::Value::Null)
            }
        });
        let target = ElementTarget::new("button[aria-expanded]", 1);
        assert_eq!(
            read_expanded_state(&session, &target).await,
            ExpandedState::Expanded
        );
    }
}
