//! Tests for the `:missing` modifier.

use helios_predicate::types::{Criterion, SearchModifier, SearchPrefix, SearchValue};

use crate::common::*;

fn missing(param: Criterion, values: Vec<SearchValue>) -> Criterion {
    param.with_modifier(SearchModifier::Missing).with_values(values)
}

fn seed_patients(harness: &TestHarness) {
    let name = patient_name();
    let birthdate = patient_birthdate();
    harness.index(
        "Patient",
        "complete",
        vec![(&name, string_row("Smith")), (&birthdate, date_row("1980-01-15"))],
    );
    harness.index("Patient", "nameless", vec![(&birthdate, date_row("1990"))]);
    harness.index("Patient", "undated", vec![(&name, string_row("Jones"))]);
}

// ============================================================================
// Missing Modifier Tests
// ============================================================================

#[tokio::test]
async fn test_missing_true_finds_records_without_rows() {
    let harness = TestHarness::new();
    seed_patients(&harness);

    let criterion = missing(Criterion::new(patient_birthdate()), vec![SearchValue::Missing(true)]);
    assert_eq!(harness.search("Patient", &[criterion]).await, ids(&["undated"]));
}

#[tokio::test]
async fn test_missing_false_finds_records_with_rows() {
    let harness = TestHarness::new();
    seed_patients(&harness);

    let criterion = missing(Criterion::new(patient_birthdate()), vec![SearchValue::Missing(false)]);
    assert_eq!(
        harness.search("Patient", &[criterion]).await,
        ids(&["complete", "nameless"])
    );
}

/// `:missing=true` and `:missing=false` partition the records.
#[tokio::test]
async fn test_missing_is_negation_of_present() {
    let harness = TestHarness::new();
    seed_patients(&harness);

    let absent = harness
        .search(
            "Patient",
            &[missing(Criterion::new(patient_name()), vec![SearchValue::Missing(true)])],
        )
        .await;
    let present = harness
        .search(
            "Patient",
            &[missing(Criterion::new(patient_name()), vec![SearchValue::Missing(false)])],
        )
        .await;

    assert_eq!(absent, ids(&["nameless"]));
    assert!(absent.is_disjoint(&present));
    assert_eq!(absent.len() + present.len(), 3);
}

/// No value means `:missing=true`.
#[tokio::test]
async fn test_missing_without_value() {
    let harness = TestHarness::new();
    seed_patients(&harness);

    let criterion = missing(Criterion::new(patient_name()), Vec::new());
    assert_eq!(harness.search("Patient", &[criterion]).await, ids(&["nameless"]));
}

#[tokio::test]
async fn test_missing_combined_with_other_criteria() {
    let harness = TestHarness::new();
    seed_patients(&harness);

    let criteria = [
        missing(Criterion::new(patient_birthdate()), vec![SearchValue::Missing(false)]),
        Criterion::new(patient_name()).with_value(SearchValue::string("Smith")),
    ];
    assert_eq!(harness.search("Patient", &criteria).await, ids(&["complete"]));
}

#[tokio::test]
async fn test_missing_rejects_comparator() {
    let harness = TestHarness::new();

    let criterion = missing(
        Criterion::new(patient_birthdate()),
        vec![SearchValue::Date(date("2023").with_prefix(SearchPrefix::Gt))],
    );
    let err = harness.compile("Patient", &[criterion]).await.unwrap_err();
    assert!(err.is_defect());
    assert!(err.to_string().contains("comparator 'gt'"), "{err}");
}
