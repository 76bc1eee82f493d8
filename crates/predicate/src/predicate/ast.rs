//! Predicate AST.
//!
//! A [`Predicate`] selects record versions. Its leaves are either
//! [`RowMatch`]es ("some row of this table, produced by this parameter, for
//! this record satisfies a condition") or id-set membership produced by
//! reverse chains. A [`RowCondition`] is evaluated against a single index row.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{IndexComparator, IndexTable, SearchParamId};

/// A boolean rule over record versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Matches every record.
    True,
    /// Matches no record.
    False,
    /// All members match.
    And(Vec<Predicate>),
    /// At least one member matches.
    Or(Vec<Predicate>),
    /// The member does not match.
    Not(Box<Predicate>),
    /// The record has a matching index row.
    Exists(RowMatch),
    /// The record's logical id is in the set.
    ResourceIdIn(BTreeSet<String>),
}

/// "A row in `table`, produced by `param_id`, satisfies `condition`."
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowMatch {
    /// Index table searched.
    pub table: IndexTable,
    /// Parameter that produced the rows.
    pub param_id: SearchParamId,
    /// Condition on a single row.
    pub condition: RowCondition,
}

/// A boolean rule over one index row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowCondition {
    /// Every row.
    True,
    /// No row.
    False,
    /// All members hold.
    And(Vec<RowCondition>),
    /// At least one member holds.
    Or(Vec<RowCondition>),
    /// The member does not hold.
    Not(Box<RowCondition>),
    /// Column comparison; false when the column is null.
    Compare {
        /// Column.
        field: Field,
        /// Operator.
        op: CompareOp,
        /// Right-hand side.
        value: Operand,
    },
    /// The column is null.
    IsNull(Field),
    /// The column is one of the values; false when null.
    In {
        /// Column.
        field: Field,
        /// Accepted values.
        values: BTreeSet<Operand>,
    },
    /// Text column starts with the value.
    StartsWith {
        /// Column.
        field: Field,
        /// Prefix.
        value: String,
    },
    /// Text column ends with the value.
    EndsWith {
        /// Column.
        field: Field,
        /// Suffix.
        value: String,
    },
    /// Text column contains the value.
    Contains {
        /// Column.
        field: Field,
        /// Substring.
        value: String,
    },
}

/// Index row columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// String row text.
    StringValue,
    /// Token row system.
    TokenSystem,
    /// Token row code.
    TokenCode,
    /// Quantity row magnitude.
    QuantityValue,
    /// Quantity row stored comparator.
    QuantityComparator,
    /// Quantity row unit system.
    QuantitySystem,
    /// Quantity row unit code.
    QuantityCode,
    /// Quantity row unit text.
    QuantityUnit,
    /// Date row window start.
    DateLow,
    /// Date row window end.
    DateHigh,
    /// URI row value.
    Uri,
    /// Reference row service base.
    ReferenceBaseUri,
    /// Reference row target type.
    ReferenceType,
    /// Reference row target id.
    ReferenceId,
    /// Reference row target version.
    ReferenceVersion,
}

impl Field {
    /// The table this column belongs to.
    pub fn table(&self) -> IndexTable {
        match self {
            Field::StringValue => IndexTable::String,
            Field::TokenSystem | Field::TokenCode => IndexTable::Token,
            Field::QuantityValue
            | Field::QuantityComparator
            | Field::QuantitySystem
            | Field::QuantityCode
            | Field::QuantityUnit => IndexTable::Quantity,
            Field::DateLow | Field::DateHigh => IndexTable::Date,
            Field::Uri => IndexTable::Uri,
            Field::ReferenceBaseUri
            | Field::ReferenceType
            | Field::ReferenceId
            | Field::ReferenceVersion => IndexTable::Reference,
        }
    }

    /// Column name used when rendering.
    pub fn column_name(&self) -> &'static str {
        match self {
            Field::StringValue => "value",
            Field::TokenSystem => "system",
            Field::TokenCode => "code",
            Field::QuantityValue => "value",
            Field::QuantityComparator => "comparator",
            Field::QuantitySystem => "system",
            Field::QuantityCode => "code",
            Field::QuantityUnit => "unit",
            Field::DateLow => "low",
            Field::DateHigh => "high",
            Field::Uri => "uri",
            Field::ReferenceBaseUri => "base_uri",
            Field::ReferenceType => "target_type",
            Field::ReferenceId => "target_id",
            Field::ReferenceVersion => "target_version",
        }
    }
}

/// Typed right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Text.
    Text(String),
    /// Decimal magnitude.
    Decimal(Decimal),
    /// Instant.
    Instant(DateTime<Utc>),
    /// Stored quantity comparator.
    Comparator(IndexComparator),
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::Text(s.to_string())
    }
}

impl From<String> for Operand {
    fn from(s: String) -> Self {
        Operand::Text(s)
    }
}

impl From<Decimal> for Operand {
    fn from(d: Decimal) -> Self {
        Operand::Decimal(d)
    }
}

impl From<DateTime<Utc>> for Operand {
    fn from(t: DateTime<Utc>) -> Self {
        Operand::Instant(t)
    }
}

impl From<IndexComparator> for Operand {
    fn from(c: IndexComparator) -> Self {
        Operand::Comparator(c)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

impl CompareOp {
    /// Applies the operator to an ordering of `lhs` against `rhs`.
    pub fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Eq => ordering == Equal,
            CompareOp::Ne => ordering != Equal,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Ge => ordering != Less,
            CompareOp::Lt => ordering == Less,
            CompareOp::Le => ordering != Greater,
        }
    }

    /// Operator symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

impl Predicate {
    /// Conjunction with constant folding and flattening.
    pub fn and(members: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut out = Vec::new();
        for m in members {
            match m {
                Predicate::True => {}
                Predicate::False => return Predicate::False,
                Predicate::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Predicate::True,
            1 => out.pop().unwrap_or(Predicate::True),
            _ => Predicate::And(out),
        }
    }

    /// Disjunction with constant folding and flattening.
    pub fn or(members: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut out = Vec::new();
        for m in members {
            match m {
                Predicate::False => {}
                Predicate::True => return Predicate::True,
                Predicate::Or(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Predicate::False,
            1 => out.pop().unwrap_or(Predicate::False),
            _ => Predicate::Or(out),
        }
    }

    /// Negation with constant folding.
    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Predicate) -> Predicate {
        match inner {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(p) => *p,
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// A row-existence test; a false row condition folds to `False`.
    pub fn exists(table: IndexTable, param_id: SearchParamId, condition: RowCondition) -> Predicate {
        if condition == RowCondition::False {
            return Predicate::False;
        }
        Predicate::Exists(RowMatch {
            table,
            param_id,
            condition,
        })
    }

    /// Id-set membership; an empty set folds to `False`.
    pub fn resource_id_in(ids: BTreeSet<String>) -> Predicate {
        if ids.is_empty() {
            Predicate::False
        } else {
            Predicate::ResourceIdIn(ids)
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            Predicate::And(m) | Predicate::Or(m) => {
                1 + m.iter().map(Predicate::node_count).sum::<usize>()
            }
            Predicate::Not(p) => 1 + p.node_count(),
            _ => 1,
        }
    }
}

impl RowCondition {
    /// Conjunction with constant folding and flattening.
    pub fn and(members: impl IntoIterator<Item = RowCondition>) -> RowCondition {
        let mut out = Vec::new();
        for m in members {
            match m {
                RowCondition::True => {}
                RowCondition::False => return RowCondition::False,
                RowCondition::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => RowCondition::True,
            1 => out.pop().unwrap_or(RowCondition::True),
            _ => RowCondition::And(out),
        }
    }

    /// Disjunction with constant folding and flattening.
    pub fn or(members: impl IntoIterator<Item = RowCondition>) -> RowCondition {
        let mut out = Vec::new();
        for m in members {
            match m {
                RowCondition::False => {}
                RowCondition::True => return RowCondition::True,
                RowCondition::Or(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => RowCondition::False,
            1 => out.pop().unwrap_or(RowCondition::False),
            _ => RowCondition::Or(out),
        }
    }

    /// Negation with constant folding.
    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: RowCondition) -> RowCondition {
        match inner {
            RowCondition::True => RowCondition::False,
            RowCondition::False => RowCondition::True,
            RowCondition::Not(c) => *c,
            other => RowCondition::Not(Box::new(other)),
        }
    }

    /// `field op value`.
    pub fn compare(field: Field, op: CompareOp, value: impl Into<Operand>) -> RowCondition {
        RowCondition::Compare {
            field,
            op,
            value: value.into(),
        }
    }

    /// `field = value`.
    pub fn eq(field: Field, value: impl Into<Operand>) -> RowCondition {
        Self::compare(field, CompareOp::Eq, value)
    }

    /// `field IS NULL`.
    pub fn is_null(field: Field) -> RowCondition {
        RowCondition::IsNull(field)
    }

    /// `field IN (values)`; an empty set folds to `False`.
    pub fn one_of(field: Field, values: BTreeSet<Operand>) -> RowCondition {
        if values.is_empty() {
            RowCondition::False
        } else {
            RowCondition::In { field, values }
        }
    }
}
