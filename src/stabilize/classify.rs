//! Expand/exclude classification of interactive elements.
//!
//! `classify` is a pure function over a snapshot of an element's observable
//! attributes, which keeps the FAQ-protection invariant testable without a
//! live browser. The policy is conservative: any ambiguity (an exclusion
//! term anywhere in the element's own attributes, text, or ancestor text)
//! resolves to `Excluded` — a missed expansion is preferable to interacting
//! with FAQ, navigation, or promotional UI.
//!
//! Snapshots are produced fresh on every scan and never cached across DOM
//! mutations: `aria-expanded` and text content can change between scans.

use serde::{Deserialize, Serialize};

/// Tri-state expanded/collapsed state parsed from `aria-expanded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandedState {
    Expanded,
    Collapsed,
    Unknown,
}

impl ExpandedState {
    pub fn from_attr(attr: Option<&str>) -> Self {
        match attr {
            Some("true") => Self::Expanded,
            Some("false") => Self::Collapsed,
            _ => Self::Unknown,
        }
    }
}

/// Derived classification of a candidate element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Expandable content; safe to interact with.
    Content,
    /// FAQ, navigation, partner/attribution, or otherwise off-limits.
    Excluded,
}

/// Snapshot of one interactive element's observable attributes, as returned
/// by the scan script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Position within the scan's selector match list.
    pub index: usize,
    /// Accessible label (`aria-label`).
    #[serde(default)]
    pub label: String,
    /// ARIA role or lowercase tag name.
    #[serde(default)]
    pub role: String,
    /// Class attribute.
    #[serde(default)]
    pub classes: String,
    /// Concatenated structural data markers (`data-e2e`, `data-testid`,
    /// `data-track`).
    #[serde(default)]
    pub markers: String,
    /// Visible text, truncated.
    #[serde(default)]
    pub text: String,
    /// Text of the enclosing container, truncated. An FAQ section heading
    /// here excludes every element inside it.
    #[serde(default)]
    pub ancestor_text: String,
    /// Raw `aria-expanded` value at scan time.
    #[serde(default)]
    pub expanded_attr: Option<String>,
}

impl ElementSnapshot {
    pub fn expanded(&self) -> ExpandedState {
        ExpandedState::from_attr(self.expanded_attr.as_deref())
    }

    /// Text marker identifying this element across DOM mutations, used to
    /// guard positional clicks against index drift. `None` when the element
    /// carries no text or label to match against.
    pub fn identity(&self) -> Option<&str> {
        if !self.text.is_empty() {
            Some(&self.text)
        } else if !self.label.is_empty() {
            Some(&self.label)
        } else {
            None
        }
    }

    /// Short human-readable identifier for logs and results.
    pub fn display_label(&self) -> String {
        if !self.label.is_empty() {
            self.label.clone()
        } else if !self.text.is_empty() {
            self.text.chars().take(60).collect()
        } else {
            format!("{}#{}", self.role, self.index)
        }
    }
}

/// Case-insensitive exclusion vocabulary.
#[derive(Debug, Clone)]
pub struct ExclusionVocabulary {
    terms: Vec<String>,
}

impl Default for ExclusionVocabulary {
    fn default() -> Self {
        Self {
            terms: [
                "faq",
                "frequently asked",
                "question",
                "explore",
                "partner",
                "offered by",
                "learn more about",
            ]
            .iter()
            .map(|t| t.to_string())
            .collect(),
        }
    }
}

impl ExclusionVocabulary {
    pub fn new(terms: impl IntoIterator<Item = String>) -> Self {
        Self {
            terms: terms.into_iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    fn matches(&self, field: &str) -> bool {
        if field.is_empty() {
            return false;
        }
        let lower = field.to_lowercase();
        self.terms.iter().any(|t| lower.contains(t))
    }
}

/// Classify one element snapshot against the exclusion vocabulary.
pub fn classify(snapshot: &ElementSnapshot, vocab: &ExclusionVocabulary) -> Classification {
    let own = [
        &snapshot.label,
        &snapshot.markers,
        &snapshot.classes,
        &snapshot.text,
    ];
    if own.iter().any(|f| vocab.matches(f)) {
        return Classification::Excluded;
    }
    // Ancestor container text carrying an exclusion term (an FAQ section
    // heading, for example) excludes the element as well.
    if vocab.matches(&snapshot.ancestor_text) {
        return Classification::Excluded;
    }
    Classification::Content
}

/// Build the scan script: enumerate elements matching `selector` and return
/// a JSON array of snapshots.
pub fn scan_script(selector: &str) -> String {
    format!(
        r#"(() => {{
    const snaps = [];
    document.querySelectorAll('{sel}').forEach((el, index) => {{
        const container = el.closest('section, [data-testid], div[class]');
        snaps.push({{
            index: index,
            label: el.getAttribute('aria-label') || '',
            role: el.getAttribute('role') || el.tagName.toLowerCase(),
            classes: el.getAttribute('class') || '',
            markers: [
                el.getAttribute('data-e2e') || '',
                el.getAttribute('data-testid') || '',
                el.getAttribute('data-track') || ''
            ].join(' ').trim(),
            text: (el.textContent || '').trim().slice(0, 200),
            ancestorText: container ? (container.textContent || '').trim().slice(0, 200) : '',
            expandedAttr: el.getAttribute('aria-expanded')
        }});
    }});
    return snaps;
}})()"#,
        sel = super::interact::sanitize_js_string(selector),
    )
}

// The scan script emits camelCase keys; map them onto the snapshot fields.
impl ElementSnapshot {
    pub fn from_scan_value(value: serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let get = |k: &str| {
            obj.get(k)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Some(Self {
            index: obj.get("index")?.as_u64()? as usize,
            label: get("label"),
            role: get("role"),
            classes: get("classes"),
            markers: get("markers"),
            text: get("text"),
            ancestor_text: get("ancestorText"),
            expanded_attr: obj
                .get("expandedAttr")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        })
    }
}
