//! Tests for string search parameters.

use helios_predicate::types::{Criterion, SearchModifier, SearchValue};

use crate::common::*;

fn name(value: &str) -> Criterion {
    Criterion::new(patient_name()).with_value(SearchValue::string(value))
}

fn seed_patients(harness: &TestHarness) {
    let param = patient_name();
    for (id, text) in [
        ("smith", "Smith"),
        ("smithson", "Smithson"),
        ("goldsmith", "Goldsmith"),
        ("blacksmithy", "Blacksmithy"),
        ("jones", "Jones"),
    ] {
        harness.index("Patient", id, vec![(&param, string_row(text))]);
    }
}

// ============================================================================
// String Search Tests
// ============================================================================

/// The default match anchors the value at either end of the stored text.
#[tokio::test]
async fn test_string_search_default_matches_either_end() {
    let harness = TestHarness::new();
    let param = patient_name();
    for (id, text) in [
        ("prefix", "smithson"),
        ("suffix", "goldsmith"),
        ("inner", "blacksmithy"),
    ] {
        harness.index("Patient", id, vec![(&param, string_row(text))]);
    }

    let found = harness.search("Patient", &[name("smith")]).await;
    assert_eq!(found, ids(&["prefix", "suffix"]));
}

#[tokio::test]
async fn test_string_search_exact() {
    let harness = TestHarness::new();
    seed_patients(&harness);

    let found = harness
        .search("Patient", &[name("Smith").with_modifier(SearchModifier::Exact)])
        .await;
    assert_eq!(found, ids(&["smith"]));
}

#[tokio::test]
async fn test_string_search_contains() {
    let harness = TestHarness::new();
    seed_patients(&harness);

    let found = harness
        .search("Patient", &[name("mith").with_modifier(SearchModifier::Contains)])
        .await;
    assert_eq!(found, ids(&["blacksmithy", "goldsmith", "smith", "smithson"]));
}

/// A record with several names matches if any of them does.
#[tokio::test]
async fn test_string_search_any_row_of_record() {
    let harness = TestHarness::new();
    let param = patient_name();
    harness.index(
        "Patient",
        "married",
        vec![(&param, string_row("Jones")), (&param, string_row("Smith"))],
    );
    harness.index("Patient", "single", vec![(&param, string_row("Jones"))]);

    let found = harness
        .search("Patient", &[name("Smith").with_modifier(SearchModifier::Exact)])
        .await;
    assert_eq!(found, ids(&["married"]));
}

#[tokio::test]
async fn test_string_search_rejects_below() {
    let harness = TestHarness::new();

    let err = harness
        .compile("Patient", &[name("Smith").with_modifier(SearchModifier::Below)])
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(err.is_defect());
    assert!(msg.contains(":below"), "{msg}");
    assert!(msg.contains("allowed: missing, exact, contains"), "{msg}");
}
