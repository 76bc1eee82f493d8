//! Token parameter handler.

use crate::predicate::{Field, RowCondition};
use crate::types::TokenValue;

/// Builds row conditions for token values. Tokens have no comparators; the
/// value's match mode decides which columns must be equal.
pub struct TokenHandler;

impl TokenHandler {
    /// Builds the condition for one alternative value.
    pub fn build(value: &TokenValue) -> RowCondition {
        match value {
            TokenValue::Code(code) => RowCondition::eq(Field::TokenCode, code.as_str()),
            TokenValue::System(system) => RowCondition::eq(Field::TokenSystem, system.as_str()),
            TokenValue::SystemAndCode { system, code } => RowCondition::and([
                RowCondition::eq(Field::TokenSystem, system.as_str()),
                RowCondition::eq(Field::TokenCode, code.as_str()),
            ]),
            TokenValue::CodeWithoutSystem(code) => RowCondition::and([
                RowCondition::is_null(Field::TokenSystem),
                RowCondition::eq(Field::TokenCode, code.as_str()),
            ]),
        }
    }
}
