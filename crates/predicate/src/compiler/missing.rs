//! `:missing` handling, shared by every indexed type.

use crate::error::{DefectError, PredicateResult};
use crate::predicate::{Predicate, RowCondition};
use crate::types::{Criterion, IndexTable, SearchValue};

/// Builds existence tests for `:missing` criteria.
///
/// `:missing=true` (or no value) is the negation of "a row exists for this
/// parameter"; `:missing=false` is that existence test itself.
pub struct MissingHandler;

impl MissingHandler {
    /// Builds the predicate for a `:missing` criterion.
    pub fn build(criterion: &Criterion) -> PredicateResult<Predicate> {
        let param = &criterion.parameter;
        let table = IndexTable::for_param_type(param.param_type).ok_or_else(|| {
            DefectError::ValueTypeMismatch {
                parameter: param.code.clone(),
                expected: param.param_type,
                found: "missing".to_string(),
            }
        })?;

        let mut wanted = Vec::with_capacity(criterion.values.len().max(1));
        for value in &criterion.values {
            match value {
                SearchValue::Missing(missing) => wanted.push(*missing),
                other => {
                    if let Some(prefix) = other.prefix() {
                        return Err(DefectError::ComparatorOnMissing {
                            parameter: param.code.clone(),
                            prefix: prefix.to_string(),
                        }
                        .into());
                    }
                    return Err(DefectError::ValueTypeMismatch {
                        parameter: param.code.clone(),
                        expected: param.param_type,
                        found: other.kind_name().to_string(),
                    }
                    .into());
                }
            }
        }
        if wanted.is_empty() {
            wanted.push(true);
        }

        let exists = Predicate::exists(table, param.id(), RowCondition::True);
        Ok(Predicate::or(wanted.into_iter().map(|missing| {
            if missing {
                Predicate::not(exists.clone())
            } else {
                exists.clone()
            }
        })))
    }
}
