//! URI parameter handler.

use crate::error::PredicateResult;
use crate::predicate::{Field, RowCondition};
use crate::search::SearchParameterDefinition;
use crate::types::{SearchModifier, UriValue};

use super::unsupported_modifier;

/// Builds row conditions for URI values.
pub struct UriHandler;

impl UriHandler {
    /// Builds the condition for one alternative value.
    ///
    /// `:below` matches stored URIs that start with the value, `:above` those
    /// that end with it.
    pub fn build(
        param: &SearchParameterDefinition,
        modifier: Option<&SearchModifier>,
        value: &UriValue,
    ) -> PredicateResult<RowCondition> {
        let text = value.value.clone();
        let condition = match modifier {
            None | Some(SearchModifier::Exact) => RowCondition::eq(Field::Uri, text),
            Some(SearchModifier::Contains) => RowCondition::Contains {
                field: Field::Uri,
                value: text,
            },
            Some(SearchModifier::Below) => RowCondition::StartsWith {
                field: Field::Uri,
                value: text,
            },
            Some(SearchModifier::Above) => RowCondition::EndsWith {
                field: Field::Uri,
                value: text,
            },
            Some(other) => return Err(unsupported_modifier(param, other).into()),
        };
        Ok(condition)
    }
}
