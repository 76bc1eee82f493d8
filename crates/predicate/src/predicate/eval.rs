//! Evaluation of predicates over in-memory index rows.
//!
//! Comparisons follow SQL null semantics: a comparison against a null column
//! is false, and only [`RowCondition::IsNull`] observes nulls.

use std::cmp::Ordering;

use crate::types::{IndexEntry, IndexRow};

use super::ast::{Field, Operand, Predicate, RowCondition};

impl Predicate {
    /// Evaluates the predicate for one record given all of its index entries.
    pub fn matches(&self, resource_id: &str, entries: &[IndexEntry]) -> bool {
        match self {
            Predicate::True => true,
            Predicate::False => false,
            Predicate::And(members) => members.iter().all(|m| m.matches(resource_id, entries)),
            Predicate::Or(members) => members.iter().any(|m| m.matches(resource_id, entries)),
            Predicate::Not(inner) => !inner.matches(resource_id, entries),
            Predicate::Exists(row_match) => entries.iter().any(|e| {
                e.param_id == row_match.param_id
                    && e.row.table() == row_match.table
                    && row_match.condition.matches(&e.row)
            }),
            Predicate::ResourceIdIn(ids) => ids.contains(resource_id),
        }
    }
}

impl RowCondition {
    /// Evaluates the condition against a single row.
    pub fn matches(&self, row: &IndexRow) -> bool {
        match self {
            RowCondition::True => true,
            RowCondition::False => false,
            RowCondition::And(members) => members.iter().all(|m| m.matches(row)),
            RowCondition::Or(members) => members.iter().any(|m| m.matches(row)),
            RowCondition::Not(inner) => !inner.matches(row),
            RowCondition::Compare { field, op, value } => match field_value(row, *field) {
                Some(actual) => compare_operands(&actual, value)
                    .map(|ord| op.holds(ord))
                    .unwrap_or(false),
                None => false,
            },
            RowCondition::IsNull(field) => field_value(row, *field).is_none(),
            RowCondition::In { field, values } => match field_value(row, *field) {
                Some(actual) => values.contains(&actual),
                None => false,
            },
            RowCondition::StartsWith { field, value } => {
                text_value(row, *field).is_some_and(|t| t.starts_with(value.as_str()))
            }
            RowCondition::EndsWith { field, value } => {
                text_value(row, *field).is_some_and(|t| t.ends_with(value.as_str()))
            }
            RowCondition::Contains { field, value } => {
                text_value(row, *field).is_some_and(|t| t.contains(value.as_str()))
            }
        }
    }
}

/// Orders two operands of the same kind; mixed kinds are incomparable.
fn compare_operands(lhs: &Operand, rhs: &Operand) -> Option<Ordering> {
    match (lhs, rhs) {
        (Operand::Text(a), Operand::Text(b)) => Some(a.cmp(b)),
        (Operand::Decimal(a), Operand::Decimal(b)) => Some(a.cmp(b)),
        (Operand::Instant(a), Operand::Instant(b)) => Some(a.cmp(b)),
        (Operand::Comparator(a), Operand::Comparator(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn text_value(row: &IndexRow, field: Field) -> Option<String> {
    match field_value(row, field)? {
        Operand::Text(t) => Some(t),
        _ => None,
    }
}

/// Reads a column; `None` is SQL null, including columns of another table.
fn field_value(row: &IndexRow, field: Field) -> Option<Operand> {
    let text = |s: &Option<String>| s.as_ref().map(|v| Operand::Text(v.clone()));
    match (row, field) {
        (IndexRow::String { value }, Field::StringValue) => Some(Operand::Text(value.clone())),
        (IndexRow::Token { system, .. }, Field::TokenSystem) => text(system),
        (IndexRow::Token { code, .. }, Field::TokenCode) => text(code),
        (IndexRow::Quantity { value, .. }, Field::QuantityValue) => Some(Operand::Decimal(*value)),
        (IndexRow::Quantity { comparator, .. }, Field::QuantityComparator) => {
            comparator.map(Operand::Comparator)
        }
        (IndexRow::Quantity { system, .. }, Field::QuantitySystem) => text(system),
        (IndexRow::Quantity { code, .. }, Field::QuantityCode) => text(code),
        (IndexRow::Quantity { unit, .. }, Field::QuantityUnit) => text(unit),
        (IndexRow::Date { low, .. }, Field::DateLow) => low.map(Operand::Instant),
        (IndexRow::Date { high, .. }, Field::DateHigh) => high.map(Operand::Instant),
        (IndexRow::Uri { value }, Field::Uri) => Some(Operand::Text(value.clone())),
        (IndexRow::Reference { base_uri, .. }, Field::ReferenceBaseUri) => text(base_uri),
        (IndexRow::Reference { resource_type, .. }, Field::ReferenceType) => text(resource_type),
        (IndexRow::Reference { resource_id, .. }, Field::ReferenceId) => {
            Some(Operand::Text(resource_id.clone()))
        }
        (IndexRow::Reference { version, .. }, Field::ReferenceVersion) => text(version),
        _ => None,
    }
}
