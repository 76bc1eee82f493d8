//! String parameter handler.

use crate::error::PredicateResult;
use crate::predicate::{Field, RowCondition};
use crate::search::SearchParameterDefinition;
use crate::types::SearchModifier;

use super::unsupported_modifier;

/// Builds row conditions for string values.
///
/// Matching is case-sensitive against the stored value; normalization is the
/// indexer's concern.
pub struct StringHandler;

impl StringHandler {
    /// Builds the condition for one alternative value.
    pub fn build(
        param: &SearchParameterDefinition,
        modifier: Option<&SearchModifier>,
        value: &str,
    ) -> PredicateResult<RowCondition> {
        let value = value.to_string();
        let condition = match modifier {
            None => RowCondition::or([
                RowCondition::StartsWith {
                    field: Field::StringValue,
                    value: value.clone(),
                },
                RowCondition::EndsWith {
                    field: Field::StringValue,
                    value,
                },
            ]),
            Some(SearchModifier::Exact) => RowCondition::eq(Field::StringValue, value),
            Some(SearchModifier::Contains) => RowCondition::Contains {
                field: Field::StringValue,
                value,
            },
            Some(other) => return Err(unsupported_modifier(param, other).into()),
        };
        Ok(condition)
    }
}
