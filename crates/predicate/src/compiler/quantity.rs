//! Quantity parameter handler.

use rust_decimal::Decimal;

use crate::error::{DefectError, PredicateResult};
use crate::predicate::{Field, RowCondition};
use crate::search::SearchParameterDefinition;
use crate::types::QuantityValue;

use super::number::magnitude_condition;

/// Builds row conditions for quantity values.
///
/// The unit must match before the magnitude test applies:
/// - `system|code`: both unit system and unit code must be equal
/// - `code` without a system: unit code or human unit text must be equal
/// - no unit: any unit
pub struct QuantityHandler;

impl QuantityHandler {
    /// Builds the condition for one alternative value.
    pub fn build(
        param: &SearchParameterDefinition,
        value: &QuantityValue,
        margin: Decimal,
    ) -> PredicateResult<RowCondition> {
        let magnitude = value.value.ok_or_else(|| DefectError::MissingValue {
            parameter: param.code.clone(),
        })?;
        let amount = magnitude_condition(param, magnitude, value.prefix.unwrap_or_default(), margin)?;
        Ok(RowCondition::and([Self::unit_condition(value), amount]))
    }

    fn unit_condition(value: &QuantityValue) -> RowCondition {
        match (value.system.as_deref(), value.code.as_deref()) {
            (Some(system), Some(code)) => RowCondition::and([
                RowCondition::eq(Field::QuantitySystem, system),
                RowCondition::eq(Field::QuantityCode, code),
            ]),
            (None, Some(code)) => RowCondition::or([
                RowCondition::eq(Field::QuantityCode, code),
                RowCondition::eq(Field::QuantityUnit, code),
            ]),
            (Some(system), None) => RowCondition::eq(Field::QuantitySystem, system),
            (None, None) => RowCondition::True,
        }
    }
}
