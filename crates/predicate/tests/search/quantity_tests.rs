//! Tests for quantity search parameters.

use helios_predicate::types::{
    Criterion, IndexRow, NumberValue, QuantityValue, SearchPrefix, SearchValue,
};

use crate::common::*;

// ============================================================================
// Helper Functions
// ============================================================================

fn value_quantity(value: QuantityValue) -> Criterion {
    Criterion::new(observation_value_quantity()).with_value(SearchValue::Quantity(value))
}

fn seed_observations(harness: &TestHarness) {
    let param = observation_value_quantity();
    harness.index("Observation", "mg", vec![(&param, ucum_row("5.4", "mg"))]);
    harness.index("Observation", "grams", vec![(&param, ucum_row("5.4", "g"))]);
    harness.index(
        "Observation",
        "unit-text",
        vec![(
            &param,
            IndexRow::Quantity {
                value: dec("5.4"),
                comparator: None,
                system: None,
                code: None,
                unit: Some("mg".to_string()),
            },
        )],
    );
    harness.index("Observation", "large", vec![(&param, ucum_row("60", "mg"))]);
}

// ============================================================================
// Quantity Search Tests - Units
// ============================================================================

/// `5.4|http://unitsofmeasure.org|mg` needs both system and code.
#[tokio::test]
async fn test_quantity_search_system_and_code() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness
        .search(
            "Observation",
            &[value_quantity(
                QuantityValue::new(dec("5.4")).with_unit(Some(ucum()), "mg"),
            )],
        )
        .await;
    assert_eq!(found, ids(&["mg"]));
}

/// `5.4||mg` matches the unit code or the unit text.
#[tokio::test]
async fn test_quantity_search_code_matches_unit_text() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness
        .search(
            "Observation",
            &[value_quantity(QuantityValue::new(dec("5.4")).with_unit(None, "mg"))],
        )
        .await;
    assert_eq!(found, ids(&["mg", "unit-text"]));
}

/// Without a unit only the magnitude is tested.
#[tokio::test]
async fn test_quantity_search_without_unit() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness
        .search("Observation", &[value_quantity(QuantityValue::new(dec("5.4")))])
        .await;
    assert_eq!(found, ids(&["grams", "mg", "unit-text"]));
}

// ============================================================================
// Quantity Search Tests - Comparators
// ============================================================================

#[tokio::test]
async fn test_quantity_search_gt_with_unit() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let found = harness
        .search(
            "Observation",
            &[value_quantity(
                QuantityValue::new(dec("10"))
                    .with_unit(Some(ucum()), "mg")
                    .with_prefix(SearchPrefix::Gt),
            )],
        )
        .await;
    assert_eq!(found, ids(&["large"]));
}

/// A plain number on a quantity parameter compares magnitudes only.
#[tokio::test]
async fn test_quantity_search_accepts_number_value() {
    let harness = TestHarness::new();
    seed_observations(&harness);

    let criterion = Criterion::new(observation_value_quantity()).with_value(SearchValue::Number(
        NumberValue::new(dec("10")).with_prefix(SearchPrefix::Lt),
    ));
    let found = harness.search("Observation", &[criterion]).await;
    assert_eq!(found, ids(&["grams", "mg", "unit-text"]));
}

// ============================================================================
// Quantity Search Tests - Trichotomy
// ============================================================================

/// For plain rows in the queried unit, exactly one of `eq`, `gt` and `lt`
/// holds, including rows on either edge of the tolerance band.
#[tokio::test]
async fn test_quantity_search_rows_fall_in_exactly_one_of_eq_gt_lt() {
    let harness = TestHarness::new();
    let param = observation_value_quantity();
    let magnitudes = [
        ("below-band", "5.3499"),
        ("band-low", "5.35"),
        ("center", "5.4"),
        ("band-top", "5.4499999"),
        ("band-high", "5.45"),
        ("far", "60"),
    ];
    for (id, magnitude) in magnitudes {
        harness.index("Observation", id, vec![(&param, ucum_row(magnitude, "mg"))]);
    }

    for query in ["5.4", "5.40", "5"] {
        let search = |prefix: Option<SearchPrefix>| {
            let mut value = QuantityValue::new(dec(query)).with_unit(Some(ucum()), "mg");
            if let Some(prefix) = prefix {
                value = value.with_prefix(prefix);
            }
            value_quantity(value)
        };
        let eq = harness.search("Observation", &[search(None)]).await;
        let gt = harness
            .search("Observation", &[search(Some(SearchPrefix::Gt))])
            .await;
        let lt = harness
            .search("Observation", &[search(Some(SearchPrefix::Lt))])
            .await;

        for (id, _) in magnitudes {
            let held = [eq.contains(id), gt.contains(id), lt.contains(id)];
            assert_eq!(
                held.iter().filter(|h| **h).count(),
                1,
                "{id} against {query}: eq/gt/lt = {held:?}"
            );
        }
    }

    let eq = harness
        .search(
            "Observation",
            &[value_quantity(
                QuantityValue::new(dec("5.4")).with_unit(Some(ucum()), "mg"),
            )],
        )
        .await;
    assert_eq!(eq, ids(&["band-low", "band-top", "center"]));
}
