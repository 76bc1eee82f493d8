//! Tests for token search parameters.

use helios_predicate::types::{
    Criterion, IndexRow, SearchModifier, SearchPrefix, SearchValue, TokenValue,
};
use helios_predicate::{DefectError, PredicateError};

use crate::common::*;

// ============================================================================
// Helper Functions
// ============================================================================

fn code(value: &str) -> Criterion {
    Criterion::new(observation_code()).with_value(SearchValue::token(value))
}

fn seed_observations(harness: &TestHarness) {
    let param = observation_code();
    harness.index("Observation", "loinc-bp", vec![(&param, loinc_row("85354-9"))]);
    harness.index("Observation", "loinc-hr", vec![(&param, loinc_row("8867-4"))]);
    harness.index("Observation", "local-bp", vec![(&param, code_row("85354-9"))]);
    harness.index(
        "Observation",
        "snomed",
        vec![(
            &param,
            IndexRow::Token {
                system: Some("http://snomed.info/sct".to_string()),
                code: Some("271649006".to_string()),
            },
        )],
    );
}

// ============================================================================
// Token Search Tests - Match Modes
// ============================================================================

/// `code` matches the code in any system.
#[tokio::test]
async fn test_token_search_code_any_system() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness.search("Observation", &[code("85354-9")]).await;
    assert_eq!(found, ids(&["local-bp", "loinc-bp"]));
}

/// `system|code` matches only within the system.
#[tokio::test]
async fn test_token_search_system_and_code() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness
        .search("Observation", &[code("http://loinc.org|85354-9")])
        .await;
    assert_eq!(found, ids(&["loinc-bp"]));
}

/// `system|` matches any code in the system.
#[tokio::test]
async fn test_token_search_system_only() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness.search("Observation", &[code("http://loinc.org|")]).await;
    assert_eq!(found, ids(&["loinc-bp", "loinc-hr"]));
}

/// `|code` matches only rows without a system.
#[tokio::test]
async fn test_token_search_code_without_system() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness.search("Observation", &[code("|85354-9")]).await;
    assert_eq!(found, ids(&["local-bp"]));
}

/// Token codes compare case-sensitively.
#[tokio::test]
async fn test_token_search_case_sensitive() {
    let harness = TestHarness::new();
    let param = observation_code();
    harness.index("Observation", "upper", vec![(&param, code_row("ABC"))]);

    assert!(harness.search("Observation", &[code("abc")]).await.is_empty());
    assert_eq!(harness.search("Observation", &[code("ABC")]).await, ids(&["upper"]));
}

// ============================================================================
// Token Search Tests - Combination
// ============================================================================

/// Values OR within a criterion, criteria AND across.
#[tokio::test]
async fn test_token_search_or_within_and_across() {
    let harness = TestHarness::new();
    let code_param = observation_code();
    let status = observation_status();
    harness.index(
        "Observation",
        "bp-final",
        vec![(&code_param, loinc_row("85354-9")), (&status, code_row("final"))],
    );
    harness.index(
        "Observation",
        "hr-final",
        vec![(&code_param, loinc_row("8867-4")), (&status, code_row("final"))],
    );
    harness.index(
        "Observation",
        "hr-preliminary",
        vec![(&code_param, loinc_row("8867-4")), (&status, code_row("preliminary"))],
    );

    let either_code = Criterion::new(observation_code())
        .with_values([loinc("85354-9"), loinc("8867-4")]);
    assert_eq!(
        harness.search("Observation", &[either_code.clone()]).await,
        ids(&["bp-final", "hr-final", "hr-preliminary"])
    );

    let final_only = Criterion::new(status).with_value(SearchValue::Token(TokenValue::Code(
        "final".to_string(),
    )));
    assert_eq!(
        harness
            .search("Observation", &[either_code, final_only])
            .await,
        ids(&["bp-final", "hr-final"])
    );
}

// ============================================================================
// Token Search Tests - Defects
// ============================================================================

#[tokio::test]
async fn test_token_search_rejects_text_modifier() {
    let harness = TestHarness::new();

    let err = harness
        .compile(
            "Observation",
            &[code("85354-9").with_modifier(SearchModifier::Contains)],
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PredicateError::Defect(DefectError::UnsupportedModifier { .. })
    ));
    let msg = err.to_string();
    assert!(msg.contains("code"), "{msg}");
    assert!(msg.contains(":contains"), "{msg}");
}

/// Tokens accept no comparator other than `eq`.
#[tokio::test]
async fn test_token_search_rejects_prefix() {
    let harness = TestHarness::new();

    let criterion = Criterion::new(observation_date())
        .with_value(SearchValue::Date(date("2023").with_prefix(SearchPrefix::Gt)));
    assert!(harness.compile("Observation", &[criterion]).await.is_ok());

    let err = harness
        .compile(
            "Observation",
            &[Criterion::new(observation_code()).with_value(SearchValue::Date(
                date("2023").with_prefix(SearchPrefix::Gt),
            ))],
        )
        .await
        .unwrap_err();
    assert!(err.is_defect());
    assert!(err.to_string().contains("'gt'"), "{err}");
}
