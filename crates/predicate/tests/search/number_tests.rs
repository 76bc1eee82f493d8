//! Tests for number search parameters.
//!
//! A query value implies a tolerance band from its precision, and stored
//! rows may carry their own comparator.

use helios_predicate::types::{
    Criterion, IndexComparator, NumberValue, SearchPrefix, SearchValue,
};
use helios_predicate::{DefectError, PredicateError};

use crate::common::*;

// ============================================================================
// Helper Functions
// ============================================================================

fn probability(value: &str, prefix: Option<SearchPrefix>) -> Criterion {
    let mut value = NumberValue::new(dec(value));
    if let Some(prefix) = prefix {
        value = value.with_prefix(prefix);
    }
    Criterion::new(risk_probability()).with_value(SearchValue::Number(value))
}

/// Points near 5.0 plus two stored inequalities.
fn seed_assessments(harness: &TestHarness) {
    let param = risk_probability();
    harness.index("RiskAssessment", "inside", vec![(&param, number_row("4.96"))]);
    harness.index("RiskAssessment", "above", vec![(&param, number_row("5.06"))]);
    harness.index("RiskAssessment", "six", vec![(&param, number_row("6.0"))]);
    harness.index("RiskAssessment", "four", vec![(&param, number_row("4.0"))]);
    harness.index(
        "RiskAssessment",
        "at-least-six",
        vec![(&param, ray_row(IndexComparator::Ge, "6"))],
    );
    harness.index(
        "RiskAssessment",
        "under-three",
        vec![(&param, ray_row(IndexComparator::Lt, "3"))],
    );
}

fn seed_points(harness: &TestHarness) {
    let param = risk_probability();
    for (id, value) in [
        ("a", "4.9"),
        ("b", "4.95"),
        ("c", "5"),
        ("d", "5.049"),
        ("e", "5.05"),
        ("f", "7.25"),
    ] {
        harness.index("RiskAssessment", id, vec![(&param, number_row(value))]);
    }
}

// ============================================================================
// Number Search Tests - Precision
// ============================================================================

/// `5.0` covers `[4.95, 5.05)`.
#[tokio::test]
async fn test_number_search_eq_uses_precision() {
    let harness = TestHarness::new();
    seed_assessments(&harness);

    let found = harness
        .search("RiskAssessment", &[probability("5.0", None)])
        .await;
    assert_eq!(found, ids(&["inside"]));
}

/// An integer query has a wider band than a one-decimal query.
#[tokio::test]
async fn test_number_search_integer_band() {
    let harness = TestHarness::new();
    seed_points(&harness);

    let found = harness
        .search("RiskAssessment", &[probability("5", None)])
        .await;
    assert_eq!(found, ids(&["a", "b", "c", "d", "e"]));
}

// ============================================================================
// Number Search Tests - Comparators
// ============================================================================

/// `gt 5.0` matches larger points and a stored `>=6`.
#[tokio::test]
async fn test_number_search_gt_includes_upward_ray() {
    let harness = TestHarness::new();
    seed_assessments(&harness);

    let found = harness
        .search("RiskAssessment", &[probability("5.0", Some(SearchPrefix::Gt))])
        .await;
    assert_eq!(found, ids(&["above", "at-least-six", "six"]));
}

#[tokio::test]
async fn test_number_search_lt_includes_downward_ray() {
    let harness = TestHarness::new();
    seed_assessments(&harness);

    let found = harness
        .search("RiskAssessment", &[probability("5.0", Some(SearchPrefix::Lt))])
        .await;
    assert_eq!(found, ids(&["four", "under-three"]));
}

#[tokio::test]
async fn test_number_search_ge_and_le_include_band() {
    let harness = TestHarness::new();
    seed_assessments(&harness);

    let ge = harness
        .search("RiskAssessment", &[probability("5.0", Some(SearchPrefix::Ge))])
        .await;
    assert_eq!(ge, ids(&["above", "at-least-six", "inside", "six"]));

    let le = harness
        .search("RiskAssessment", &[probability("5.0", Some(SearchPrefix::Le))])
        .await;
    assert_eq!(le, ids(&["four", "inside", "under-three"]));
}

/// Every point row is exactly one of below, equal to, or above the query.
#[tokio::test]
async fn test_number_search_trichotomy() {
    let harness = TestHarness::new();
    seed_points(&harness);

    for query in ["5.0", "5", "4.95", "7.3"] {
        let lt = harness
            .search("RiskAssessment", &[probability(query, Some(SearchPrefix::Lt))])
            .await;
        let eq = harness
            .search("RiskAssessment", &[probability(query, None)])
            .await;
        let gt = harness
            .search("RiskAssessment", &[probability(query, Some(SearchPrefix::Gt))])
            .await;

        assert!(lt.is_disjoint(&eq), "lt/eq overlap for {query}");
        assert!(eq.is_disjoint(&gt), "eq/gt overlap for {query}");
        assert!(lt.is_disjoint(&gt), "lt/gt overlap for {query}");
        assert_eq!(lt.len() + eq.len() + gt.len(), 6, "missing rows for {query}");
    }
}

/// `ne` is the complement of `eq` over all rows, rays included.
#[tokio::test]
async fn test_number_search_ne_complements_eq() {
    let harness = TestHarness::new();
    seed_assessments(&harness);

    let eq = harness
        .search("RiskAssessment", &[probability("5.0", None)])
        .await;
    let ne = harness
        .search("RiskAssessment", &[probability("5.0", Some(SearchPrefix::Ne))])
        .await;

    assert!(eq.is_disjoint(&ne));
    assert_eq!(eq.len() + ne.len(), 6);
}

/// `ap 100` uses the configured 10% margin.
#[tokio::test]
async fn test_number_search_approximately() {
    let harness = TestHarness::new();
    let param = risk_probability();
    for (id, value) in [("low", "89"), ("near-low", "91"), ("near-high", "109"), ("high", "111")] {
        harness.index("RiskAssessment", id, vec![(&param, number_row(value))]);
    }

    let found = harness
        .search("RiskAssessment", &[probability("100", Some(SearchPrefix::Ap))])
        .await;
    assert_eq!(found, ids(&["near-high", "near-low"]));
}

// ============================================================================
// Number Search Tests - Defects
// ============================================================================

#[tokio::test]
async fn test_number_search_rejects_unrepresentable_scale() {
    let harness = TestHarness::new();

    let err = harness
        .compile(
            "RiskAssessment",
            &[probability("0.0000000000000000000000000001", None)],
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PredicateError::Defect(DefectError::InvalidScale { .. })
    ));
    assert!(err.to_string().contains("probability"));
}
