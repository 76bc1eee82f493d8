//! Textual rendering of predicates, used by explain output and logs.

use std::fmt;

use super::ast::{CompareOp, Field, Operand, Predicate, RowCondition, RowMatch};

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::True => write!(f, "TRUE"),
            Predicate::False => write!(f, "FALSE"),
            Predicate::And(members) => write_joined(f, members, " AND "),
            Predicate::Or(members) => write_joined(f, members, " OR "),
            Predicate::Not(inner) => write!(f, "NOT {}", inner),
            Predicate::Exists(row_match) => write!(f, "{}", row_match),
            Predicate::ResourceIdIn(ids) => {
                write!(f, "id IN (")?;
                write_quoted_list(f, ids.iter().map(String::as_str))?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for RowMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EXISTS({} [{}] WHERE {})",
            self.table, self.param_id, self.condition
        )
    }
}

impl fmt::Display for RowCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowCondition::True => write!(f, "TRUE"),
            RowCondition::False => write!(f, "FALSE"),
            RowCondition::And(members) => write_joined(f, members, " AND "),
            RowCondition::Or(members) => write_joined(f, members, " OR "),
            RowCondition::Not(inner) => write!(f, "NOT {}", inner),
            RowCondition::Compare { field, op, value } => write!(f, "{} {} {}", field, op, value),
            RowCondition::IsNull(field) => write!(f, "{} IS NULL", field),
            RowCondition::In { field, values } => {
                write!(f, "{} IN (", field)?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            RowCondition::StartsWith { field, value } => {
                write!(f, "{} LIKE '{}%'", field, escape(value))
            }
            RowCondition::EndsWith { field, value } => {
                write!(f, "{} LIKE '%{}'", field, escape(value))
            }
            RowCondition::Contains { field, value } => {
                write!(f, "{} LIKE '%{}%'", field, escape(value))
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Text(t) => write!(f, "'{}'", escape(t)),
            Operand::Decimal(d) => write!(f, "{}", d),
            Operand::Instant(t) => write!(f, "'{}'", t.to_rfc3339()),
            Operand::Comparator(c) => write!(f, "'{}'", c),
        }
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, members: &[T], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, m) in members.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", m)?;
    }
    write!(f, ")")
}

fn write_quoted_list<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a str>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "'{}'", escape(item))?;
    }
    Ok(())
}

fn escape(s: &str) -> String {
    s.replace('\'', "''")
}
