//! Tests for reference search parameters.
//!
//! References are local when they carry no service base or the server's own
//! base; local references are indexed without a base.

use helios_predicate::types::{Criterion, IndexRow, ReferenceValue, SearchModifier, SearchValue};
use helios_predicate::{ChainError, CompilerConfig, DefectError, PredicateError};

use crate::common::*;

// ============================================================================
// Helper Functions
// ============================================================================

fn subject(value: &str) -> Criterion {
    Criterion::new(observation_subject())
        .with_value(SearchValue::Reference(ReferenceValue::parse(value).unwrap()))
}

fn seed_observations(harness: &TestHarness) {
    let param = observation_subject();
    harness.index("Observation", "o1", vec![(&param, reference_row("Patient", "1"))]);
    harness.index("Observation", "o2", vec![(&param, reference_row("Patient", "2"))]);
    harness.index("Observation", "o3", vec![(&param, reference_row("Group", "1"))]);
    harness.index(
        "Observation",
        "o4",
        vec![(
            &param,
            remote_reference_row("https://other.org/fhir", "Patient", "1"),
        )],
    );
    harness.index(
        "Observation",
        "o5",
        vec![(
            &param,
            IndexRow::Reference {
                base_uri: None,
                resource_type: Some("Patient".to_string()),
                resource_id: "1".to_string(),
                version: Some("3".to_string()),
            },
        )],
    );
}

// ============================================================================
// Reference Search Tests - Locality
// ============================================================================

#[tokio::test]
async fn test_reference_search_relative() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness.search("Observation", &[subject("Patient/1")]).await;
    assert_eq!(found, ids(&["o1", "o5"]));
}

/// An absolute reference on this server's base is local.
#[tokio::test]
async fn test_reference_search_own_base_is_local() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness
        .search("Observation", &[subject("https://acme.org/fhir/Patient/1")])
        .await;
    assert_eq!(found, ids(&["o1", "o5"]));
}

/// The server's own base is recognised however its host and port are spelled.
#[tokio::test]
async fn test_reference_search_own_base_spellings_are_local() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    for value in [
        "https://ACME.org/fhir/Patient/1",
        "https://acme.org:443/fhir/Patient/1",
        "https://acme.org/fhir/Patient/1/",
    ] {
        let found = harness.search("Observation", &[subject(value)]).await;
        assert_eq!(found, ids(&["o1", "o5"]), "{value}");
    }
}

#[tokio::test]
async fn test_reference_search_remote_base() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness
        .search("Observation", &[subject("https://other.org/fhir/Patient/1")])
        .await;
    assert_eq!(found, ids(&["o4"]));
}

#[tokio::test]
async fn test_reference_search_versioned() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness
        .search("Observation", &[subject("Patient/1/_history/3")])
        .await;
    assert_eq!(found, ids(&["o5"]));
}

/// A bare id matches local references of any type.
#[tokio::test]
async fn test_reference_search_bare_id() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness.search("Observation", &[subject("1")]).await;
    assert_eq!(found, ids(&["o1", "o3", "o5"]));
}

// ============================================================================
// Reference Search Tests - Type Modifier
// ============================================================================

#[tokio::test]
async fn test_reference_search_type_modifier() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness
        .search(
            "Observation",
            &[subject("1").with_modifier(SearchModifier::Type("Patient".to_string()))],
        )
        .await;
    assert_eq!(found, ids(&["o1", "o5"]));
}

/// A value naming another type than the modifier can never match.
#[tokio::test]
async fn test_reference_search_conflicting_type_matches_nothing() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness
        .search(
            "Observation",
            &[subject("Group/1").with_modifier(SearchModifier::Type("Patient".to_string()))],
        )
        .await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_reference_search_type_outside_targets_is_defect() {
    let harness = TestHarness::new();

    let err = harness
        .compile(
            "Observation",
            &[subject("1").with_modifier(SearchModifier::Type("Organization".to_string()))],
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PredicateError::Defect(DefectError::InvalidChainTarget { .. })
    ));
    assert!(err.to_string().contains("Organization"), "{err}");
}

// ============================================================================
// Reference Search Tests - Reference Sets
// ============================================================================

/// The reference-set rewrite changes the predicate shape, never the result.
#[tokio::test]
async fn test_reference_set_collapse_preserves_matches() {
    let criterion = Criterion::new(observation_subject()).with_values([
        SearchValue::Reference(ReferenceValue::local("Patient", "1")),
        SearchValue::Reference(ReferenceValue::local("Patient", "2")),
        SearchValue::Reference(ReferenceValue::local("Group", "1")),
    ]);

    let collapsed = TestHarness::new();
    seed_observations(&collapsed);
    let plain = TestHarness::with_config(CompilerConfig {
        collapse_reference_sets: false,
        ..Default::default()
    });
    seed_observations(&plain);

    let collapsed_predicate = collapsed
        .compile("Observation", std::slice::from_ref(&criterion))
        .await
        .unwrap();
    let plain_predicate = plain
        .compile("Observation", std::slice::from_ref(&criterion))
        .await
        .unwrap();
    assert!(collapsed_predicate.to_string().contains("target_id IN ("));
    assert!(!plain_predicate.to_string().contains(" IN ("));
    assert!(collapsed_predicate.node_count() <= plain_predicate.node_count());

    let expected = ids(&["o1", "o2", "o3", "o5"]);
    assert_eq!(
        collapsed
            .search("Observation", std::slice::from_ref(&criterion))
            .await,
        expected
    );
    assert_eq!(plain.search("Observation", &[criterion]).await, expected);
}

// ============================================================================
// Reference Search Tests - Depth Errors
// ============================================================================

#[tokio::test]
async fn test_reference_chain_depth_error_names_parameter() {
    let harness = TestHarness::with_config(CompilerConfig {
        max_chain_depth: 1,
        ..Default::default()
    });

    let name = Criterion::new(organization_name()).with_value(SearchValue::string("Acme"));
    let organization = Criterion::new(patient_organization()).chained("Organization", vec![name]);
    let criterion = Criterion::new(observation_subject()).chained("Patient", vec![organization]);

    let err = harness.compile("Observation", &[criterion]).await.unwrap_err();
    assert!(matches!(
        err,
        PredicateError::Chain(ChainError::MaxDepthExceeded { depth: 2, max: 1, .. })
    ));
    assert!(err.to_string().contains("'organization'"), "{err}");
}
