//! Rule Table Reload Integration Tests
//!
//! Hot-reload semantics: a valid document swaps the tables atomically and
//! live classifiers pick it up; an invalid one is rejected and the previous
//! tables stay in service.

use saathi_router::{PatternClassifier, RuleSet};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_reload_from_file_applies_to_live_classifier() {
    let rules = RuleSet::new();
    let classifier = PatternClassifier::new(rules.clone());

    assert!(!classifier.is_greeting("howdy"));

    let mut file = NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{"greetings": ["howdy", "hi", "hello"]}}"#
    )
    .expect("write rules");

    rules.reload_from_path(file.path()).expect("reload");

    // same classifier instance, new tables
    assert!(classifier.is_greeting("howdy"));
    assert!(classifier.is_greeting("hi"));
    assert!(!classifier.is_greeting("namaste"));
}

#[test]
fn test_invalid_file_keeps_previous_tables() {
    let rules = RuleSet::new();
    let classifier = PatternClassifier::new(rules.clone());

    let mut file = NamedTempFile::new().expect("temp file");
    write!(file, "{{not json at all").expect("write rules");

    assert!(rules.reload_from_path(file.path()).is_err());
    // defaults still active
    assert!(classifier.is_greeting("namaste"));
}

#[test]
fn test_empty_complexity_list_rejected_keeps_classifier_sane() {
    let rules = RuleSet::new();
    let classifier = PatternClassifier::new(rules.clone());

    assert!(rules.load_json(r#"{"high_complexity_patterns": []}"#).is_err());

    // previous tables still active: trivial input stays SIMPLE
    assert_eq!(
        classifier.classify_complexity("ok"),
        saathi_router::Complexity::Simple
    );
}

#[test]
fn test_reset_after_reload() {
    let rules = RuleSet::new();
    let classifier = PatternClassifier::new(rules.clone());

    rules
        .load_json(r#"{"greetings": ["howdy"]}"#)
        .expect("load");
    assert!(!classifier.is_greeting("hello"));

    rules.reset();
    assert!(classifier.is_greeting("hello"));
}

#[test]
fn test_category_table_order_controls_ties() {
    let rules = RuleSet::new();
    let classifier = PatternClassifier::new(rules.clone());

    // swap priority: entertainment listed before sports
    rules
        .load_json(
            r#"{
                "categories": [
                    {"name": "entertainment", "keywords": ["ipl", "movie"]},
                    {"name": "sports", "keywords": ["ipl", "score"]}
                ]
            }"#,
        )
        .expect("load");

    assert_eq!(
        classifier.classify_domain("ipl highlights"),
        saathi_router::Domain::Entertainment
    );
}
