//! Tests for composite criteria: OR across value groups, AND within a group.

use helios_predicate::types::{
    CompositeValue, Criterion, QuantityValue, SearchModifier, SearchPrefix, SearchValue,
};
use helios_predicate::{DefectError, PredicateError};

use crate::common::*;

fn group(code: &str, value: QuantityValue) -> SearchValue {
    SearchValue::Composite(CompositeValue {
        criteria: vec![
            Criterion::new(observation_code()).with_value(loinc(code)),
            Criterion::new(observation_value_quantity()).with_value(SearchValue::Quantity(value)),
        ],
    })
}

fn seed_observations(harness: &TestHarness) {
    let code = observation_code();
    let value = observation_value_quantity();
    harness.index(
        "Observation",
        "hr-high",
        vec![(&code, loinc_row("8867-4")), (&value, ucum_row("120", "/min"))],
    );
    harness.index(
        "Observation",
        "hr-normal",
        vec![(&code, loinc_row("8867-4")), (&value, ucum_row("70", "/min"))],
    );
    harness.index(
        "Observation",
        "rr-high",
        vec![(&code, loinc_row("9279-1")), (&value, ucum_row("30", "/min"))],
    );
}

// ============================================================================
// Composite Search Tests
// ============================================================================

#[tokio::test]
async fn test_composite_group_ands_components() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let criterion = Criterion::new(observation_code_value_quantity()).with_value(group(
        "8867-4",
        QuantityValue::new(dec("100")).with_prefix(SearchPrefix::Gt),
    ));
    assert_eq!(
        harness.search("Observation", &[criterion]).await,
        ids(&["hr-high"])
    );
}

#[tokio::test]
async fn test_composite_groups_or() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let criterion = Criterion::new(observation_code_value_quantity()).with_values([
        group("8867-4", QuantityValue::new(dec("100")).with_prefix(SearchPrefix::Gt)),
        group("9279-1", QuantityValue::new(dec("25")).with_prefix(SearchPrefix::Gt)),
    ]);
    assert_eq!(
        harness.search("Observation", &[criterion]).await,
        ids(&["hr-high", "rr-high"])
    );
}

/// A composite criterion ANDs with its siblings like any other.
#[tokio::test]
async fn test_composite_and_sibling_criterion() {
    let harness = TestHarness::new();
    seed_observations(&harness);
    let status = observation_status();
    harness.index(
        "Observation",
        "hr-amended",
        vec![
            (&observation_code(), loinc_row("8867-4")),
            (&observation_value_quantity(), ucum_row("150", "/min")),
            (&status, code_row("amended")),
        ],
    );

    let criteria = [
        Criterion::new(observation_code_value_quantity()).with_value(group(
            "8867-4",
            QuantityValue::new(dec("100")).with_prefix(SearchPrefix::Gt),
        )),
        Criterion::new(status).with_value(SearchValue::token("amended")),
    ];
    assert_eq!(
        harness.search("Observation", &criteria).await,
        ids(&["hr-amended"])
    );
}

#[tokio::test]
async fn test_composite_rejects_modifier() {
    let harness = TestHarness::new();

    let criterion = Criterion::new(observation_code_value_quantity())
        .with_modifier(SearchModifier::Exact)
        .with_value(group("8867-4", QuantityValue::new(dec("100"))));
    let err = harness.compile("Observation", &[criterion]).await.unwrap_err();
    assert!(matches!(
        err,
        PredicateError::Defect(DefectError::ModifierOnComposite { .. })
    ));
}

#[tokio::test]
async fn test_composite_component_defect_propagates() {
    let harness = TestHarness::new();

    let criterion = Criterion::new(observation_code_value_quantity()).with_value(
        SearchValue::Composite(CompositeValue {
            criteria: vec![Criterion::new(patient_name()).with_value(SearchValue::string("x"))],
        }),
    );
    let err = harness.compile("Observation", &[criterion]).await.unwrap_err();
    assert!(matches!(
        err,
        PredicateError::Defect(DefectError::ParameterNotOnType { .. })
    ));
}
