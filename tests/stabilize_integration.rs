//! Integration tests over the public stabilization API.

use pagepress::export::derive_filename;
use pagepress::stabilize::classify::{
    classify, Classification, ElementSnapshot, ExclusionVocabulary,
};

fn snapshot(label: &str, text: &str, ancestor: &str, markers: &str) -> ElementSnapshot {
    ElementSnapshot {
        label: label.to_string(),
        text: text.to_string(),
        ancestor_text: ancestor.to_string(),
        markers: markers.to_string(),
        ..Default::default()
    }
}

/// FAQ protection holds wherever the marker appears: label, text, data
/// markers, or ancestor container text.
#[test]
fn faq_marker_excludes_in_every_field() {
    let vocab = ExclusionVocabulary::default();
    let cases = [
        snapshot("FAQ item", "", "", ""),
        snapshot("", "Frequently asked questions about enrollment", "", ""),
        snapshot("", "", "Frequently Asked Questions", ""),
        snapshot("", "", "", "faq-accordion"),
        snapshot("Read more", "Read more", "FAQ — everything you need to know", ""),
    ];
    for case in &cases {
        assert_eq!(
            classify(case, &vocab),
            Classification::Excluded,
            "snapshot not excluded: {case:?}"
        );
    }
}

#[test]
fn module_accordions_stay_content() {
    let vocab = ExclusionVocabulary::default();
    let cases = [
        snapshot("Module 1: Foundations", "Module 1", "Course content", "module-1"),
        snapshot("Week 3", "Week 3 · 4 hours", "Syllabus", ""),
        snapshot("Read more", "Read more", "About this course", ""),
    ];
    for case in &cases {
        assert_eq!(classify(case, &vocab), Classification::Content);
    }
}

#[test]
fn filenames_are_filesystem_safe_and_bounded() {
    let name = derive_filename(
        Some("C++: From <Zero> to \"Hero\"?"),
        None,
        "https://example.com/learn/cpp-hero?ref=abc",
    );
    assert!(name.ends_with("_cpp-hero.pdf"));
    for ch in ['<', '>', ':', '"', '/', '\\', '|', '?', '*'] {
        assert!(!name.contains(ch), "illegal character {ch:?} in {name}");
    }
    assert!(name.len() < 250);
}
