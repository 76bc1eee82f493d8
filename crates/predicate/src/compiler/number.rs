//! Number parameter handler and the magnitude logic shared with quantities.

use rust_decimal::Decimal;

use crate::error::{DefectError, PredicateResult};
use crate::predicate::{CompareOp, Field, RowCondition};
use crate::search::SearchParameterDefinition;
use crate::types::{IndexComparator, MAX_NUMBER_SCALE, NumberValue, SearchPrefix, tolerance_band};

/// Builds row conditions over decimal magnitudes.
///
/// The query value implies a half-open tolerance band from its scale: `5.0`
/// covers `[4.95, 5.05)`. A row may itself carry a comparator (a stored
/// `>=6`), in which case it represents a ray rather than a point and the
/// query comparator is composed with it.
pub struct NumberHandler;

impl NumberHandler {
    /// Builds the condition for one alternative value.
    pub fn build(
        param: &SearchParameterDefinition,
        value: &NumberValue,
        margin: Decimal,
    ) -> PredicateResult<RowCondition> {
        let magnitude = value.value.ok_or_else(|| DefectError::MissingValue {
            parameter: param.code.clone(),
        })?;
        magnitude_condition(param, magnitude, value.prefix.unwrap_or_default(), margin)
    }
}

/// Magnitude test for `prefix value`, composed with the row comparator.
pub(crate) fn magnitude_condition(
    param: &SearchParameterDefinition,
    value: Decimal,
    prefix: SearchPrefix,
    margin: Decimal,
) -> PredicateResult<RowCondition> {
    let invalid_scale = || DefectError::InvalidScale {
        parameter: param.code.clone(),
        value: value.to_string(),
        max_scale: MAX_NUMBER_SCALE,
    };
    let (low, high) = tolerance_band(value).ok_or_else(invalid_scale)?;

    let cases = match prefix {
        SearchPrefix::Eq => RowCases::equal(low, high),
        SearchPrefix::Ne => RowCases::not_equal(low, high),
        SearchPrefix::Gt | SearchPrefix::Sa => RowCases::greater(CompareOp::Ge, high),
        SearchPrefix::Ge => RowCases::greater(CompareOp::Ge, low),
        SearchPrefix::Lt | SearchPrefix::Eb => RowCases::less(CompareOp::Lt, low),
        SearchPrefix::Le => RowCases::less(CompareOp::Lt, high),
        SearchPrefix::Ap => {
            let delta = value
                .abs()
                .checked_mul(margin)
                .ok_or_else(invalid_scale)?;
            let wide_low = value.checked_sub(delta).ok_or_else(invalid_scale)?.min(low);
            let wide_high = value.checked_add(delta).ok_or_else(invalid_scale)?.max(high);
            RowCases::equal(wide_low, wide_high)
        }
    };
    Ok(cases.into_condition())
}

/// One condition per kind of stored row: a plain point, or a ray `> v`,
/// `>= v`, `< v`, `<= v`.
struct RowCases {
    point: RowCondition,
    gt: RowCondition,
    ge: RowCondition,
    lt: RowCondition,
    le: RowCondition,
}

fn value_is(op: CompareOp, at: Decimal) -> RowCondition {
    RowCondition::compare(Field::QuantityValue, op, at)
}

impl RowCases {
    /// Band `[low, high)` intersects the row.
    fn equal(low: Decimal, high: Decimal) -> Self {
        Self {
            point: RowCondition::and([value_is(CompareOp::Ge, low), value_is(CompareOp::Lt, high)]),
            gt: value_is(CompareOp::Lt, high),
            ge: value_is(CompareOp::Lt, high),
            lt: value_is(CompareOp::Gt, low),
            le: value_is(CompareOp::Ge, low),
        }
    }

    /// Row lies entirely outside `[low, high)`.
    fn not_equal(low: Decimal, high: Decimal) -> Self {
        Self {
            point: RowCondition::or([value_is(CompareOp::Lt, low), value_is(CompareOp::Ge, high)]),
            gt: value_is(CompareOp::Ge, high),
            ge: value_is(CompareOp::Ge, high),
            lt: value_is(CompareOp::Le, low),
            le: value_is(CompareOp::Lt, low),
        }
    }

    /// Row reaches `op bound` from below. Upward rays always do.
    fn greater(op: CompareOp, bound: Decimal) -> Self {
        Self {
            point: value_is(op, bound),
            gt: RowCondition::True,
            ge: RowCondition::True,
            lt: value_is(CompareOp::Gt, bound),
            le: value_is(op, bound),
        }
    }

    /// Row reaches `op bound` from above. Downward rays always do.
    fn less(op: CompareOp, bound: Decimal) -> Self {
        Self {
            point: value_is(op, bound),
            gt: value_is(op, bound),
            ge: value_is(op, bound),
            lt: RowCondition::True,
            le: RowCondition::True,
        }
    }

    fn into_condition(self) -> RowCondition {
        let stored = |c: IndexComparator| RowCondition::eq(Field::QuantityComparator, c);
        RowCondition::or([
            RowCondition::and([RowCondition::is_null(Field::QuantityComparator), self.point]),
            RowCondition::and([stored(IndexComparator::Gt), self.gt]),
            RowCondition::and([stored(IndexComparator::Ge), self.ge]),
            RowCondition::and([stored(IndexComparator::Lt), self.lt]),
            RowCondition::and([stored(IndexComparator::Le), self.le]),
        ])
    }
}
