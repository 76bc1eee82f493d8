//! Date parameter handler.

use chrono::{DateTime, Utc};

use crate::error::{DefectError, PredicateResult};
use crate::predicate::{CompareOp, Field, RowCondition};
use crate::search::SearchParameterDefinition;
use crate::types::{DateValue, SearchParamType, SearchPrefix};

/// Builds row conditions over `(low, high)` date windows.
///
/// Both the query value and the indexed value are windows: "2023" covers the
/// whole year, a stored `Period` covers its start and end. A null bound on the
/// row is unbounded in that direction.
pub struct DateHandler;

impl DateHandler {
    /// Builds the condition for one alternative value.
    pub fn build(param: &SearchParameterDefinition, value: &DateValue) -> PredicateResult<RowCondition> {
        let (start, end) = value
            .window()
            .ok_or_else(|| Self::unusable(param, value))?;

        let condition = match value.prefix.unwrap_or_default() {
            SearchPrefix::Eq => Self::overlaps(start, end),
            SearchPrefix::Ne => Self::disjoint(start, end),
            SearchPrefix::Gt => Self::high_reaches(CompareOp::Ge, end),
            SearchPrefix::Ge => Self::high_reaches(CompareOp::Ge, start),
            SearchPrefix::Lt => Self::low_reaches(CompareOp::Lt, start),
            SearchPrefix::Le => Self::low_reaches(CompareOp::Lt, end),
            SearchPrefix::Sa => RowCondition::compare(Field::DateLow, CompareOp::Ge, end),
            SearchPrefix::Eb => RowCondition::compare(Field::DateHigh, CompareOp::Lt, start),
            SearchPrefix::Ap => {
                let (wide_start, wide_end) = value
                    .approximate_window()
                    .ok_or_else(|| Self::unusable(param, value))?;
                Self::overlaps(wide_start, wide_end)
            }
        };
        Ok(condition)
    }

    /// The row window overlaps the half-open query window `[start, end)`.
    ///
    /// Expressed as the six covering cases so that every branch stays a
    /// simple range test on one or two columns.
    fn overlaps(start: DateTime<Utc>, end: DateTime<Utc>) -> RowCondition {
        let row_low = |op: CompareOp, at: DateTime<Utc>| RowCondition::compare(Field::DateLow, op, at);
        let row_high = |op: CompareOp, at: DateTime<Utc>| RowCondition::compare(Field::DateHigh, op, at);

        RowCondition::or([
            // Row inside the query window.
            RowCondition::and([row_low(CompareOp::Ge, start), row_high(CompareOp::Lt, end)]),
            // Row surrounds the query window.
            RowCondition::and([row_low(CompareOp::Le, start), row_high(CompareOp::Ge, end)]),
            // Row starts before and ends inside.
            RowCondition::and([
                row_low(CompareOp::Lt, start),
                row_high(CompareOp::Ge, start),
                row_high(CompareOp::Lt, end),
            ]),
            // Row starts inside and ends after.
            RowCondition::and([
                row_low(CompareOp::Ge, start),
                row_low(CompareOp::Lt, end),
                row_high(CompareOp::Ge, end),
            ]),
            // Open start.
            RowCondition::and([
                RowCondition::is_null(Field::DateLow),
                RowCondition::or([
                    RowCondition::is_null(Field::DateHigh),
                    row_high(CompareOp::Ge, start),
                ]),
            ]),
            // Open end.
            RowCondition::and([RowCondition::is_null(Field::DateHigh), row_low(CompareOp::Lt, end)]),
        ])
    }

    /// The row window lies entirely before or entirely after `[start, end)`.
    fn disjoint(start: DateTime<Utc>, end: DateTime<Utc>) -> RowCondition {
        RowCondition::or([
            RowCondition::compare(Field::DateHigh, CompareOp::Lt, start),
            RowCondition::compare(Field::DateLow, CompareOp::Ge, end),
        ])
    }

    fn high_reaches(op: CompareOp, at: DateTime<Utc>) -> RowCondition {
        RowCondition::or([
            RowCondition::compare(Field::DateHigh, op, at),
            RowCondition::is_null(Field::DateHigh),
        ])
    }

    fn low_reaches(op: CompareOp, at: DateTime<Utc>) -> RowCondition {
        RowCondition::or([
            RowCondition::compare(Field::DateLow, op, at),
            RowCondition::is_null(Field::DateLow),
        ])
    }

    fn unusable(param: &SearchParameterDefinition, value: &DateValue) -> DefectError {
        match value.instant {
            None => DefectError::MissingValue {
                parameter: param.code.clone(),
            },
            Some(instant) => DefectError::ValueTypeMismatch {
                parameter: param.code.clone(),
                expected: SearchParamType::Date,
                found: format!("out-of-range date {}", instant.to_rfc3339()),
            },
        }
    }
}
