//! Static suppression configuration.
//!
//! An ordered collection of selector patterns describing what to remove from
//! the live DOM and which text markers protect a node from removal. The rule
//! set is immutable for the lifetime of a session; it is serialized into the
//! generated sweep script and evaluated repeatedly against the live page.

use serde::{Deserialize, Serialize};

/// What the suppression sweep removes and what it protects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionRuleSet {
    /// Selectors removed outright: promotional modals, sale banners, ad
    /// containers. No protection check applies to these.
    pub promo_selectors: Vec<String>,
    /// Generic dialog/modal patterns, removed unless protected.
    pub dialog_selectors: Vec<String>,
    /// Class-name fragments that mark a positioned node as an overlay at a
    /// lower z-index than `z_index_threshold`.
    pub overlay_class_hints: Vec<String>,
    /// Banner/notification patterns, removed only when fixed or sticky.
    pub banner_selectors: Vec<String>,
    /// Case-insensitive text markers that protect a node from removal even
    /// when it matches a dialog or overlay pattern.
    pub protected_markers: Vec<String>,
    /// Positioned nodes above this z-index are removed unconditionally
    /// (unless protected).
    pub z_index_threshold: i64,
    /// Positioned nodes above this z-index are removed when their class
    /// matches an overlay hint.
    pub z_index_hint_threshold: i64,
    /// Cookie-consent accept controls, clicked best-effort.
    pub cookie_selectors: Vec<String>,
}

impl Default for SuppressionRuleSet {
    fn default() -> Self {
        let s = |v: &[&str]| v.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        Self {
            promo_selectors: s(&[
                "[class*=\"black-friday\"]",
                "[class*=\"Black-Friday\"]",
                "[class*=\"blackfriday\"]",
                "[class*=\"BlackFriday\"]",
                "[id*=\"black-friday\"]",
                "[id*=\"BlackFriday\"]",
                "[class*=\"cyber-monday\"]",
                "[class*=\"promotion\"]",
                "[class*=\"promo\"]",
                "[class*=\"sale-modal\"]",
                "[class*=\"discount-modal\"]",
                "[data-track*=\"promo\"]",
                "[data-track*=\"black-friday\"]",
                "[class*=\"advertisement\"]",
                "iframe[src*=\"ads\"]",
                "iframe[src*=\"doubleclick\"]",
            ]),
            dialog_selectors: s(&[
                "[role=\"dialog\"]",
                "[role=\"alertdialog\"]",
                "[class*=\"modal\"]",
                "[class*=\"Modal\"]",
                "[id*=\"modal\"]",
                "[class*=\"popup\"]",
                "[class*=\"Popup\"]",
            ]),
            overlay_class_hints: s(&["overlay", "backdrop", "modal", "popup"]),
            banner_selectors: s(&[
                "[class*=\"notification\"]",
                "[class*=\"Notification\"]",
                "[class*=\"banner\"]",
                "[class*=\"Banner\"]",
            ]),
            protected_markers: s(&["frequently asked", "faq"]),
            z_index_threshold: 999,
            z_index_hint_threshold: 100,
            cookie_selectors: s(&[
                "#onetrust-accept-btn-handler",
                "[id*=\"cookie-accept\"]",
                "button[id*=\"accept-cookie\"]",
            ]),
        }
    }
}

impl SuppressionRuleSet {
    /// JSON form for embedding into the generated sweep script.
    pub fn to_js_literal(&self) -> String {
        serde_json::to_string(self).expect("rule set serializes")
    }
}
