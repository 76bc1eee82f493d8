//! Reference parameter handler.

use crate::error::{DefectError, PredicateResult};
use crate::predicate::{Field, RowCondition};
use crate::search::SearchParameterDefinition;
use crate::tenant::{ServerIdentity, normalize_base};
use crate::types::{ReferenceValue, SearchModifier};

use super::unsupported_modifier;

/// Builds row conditions for reference values.
///
/// A reference whose service base is absent or equal to the server identity
/// is local and matches rows stored without a base. Any other base is remote
/// and must be equal to the stored base.
///
/// Each alternative is a plain conjunction of equalities. Collapsing several
/// same-shaped alternatives into one id-set test is left to
/// [`collapse_reference_sets`](crate::predicate::collapse_reference_sets).
pub struct ReferenceHandler;

impl ReferenceHandler {
    /// Builds the condition for one alternative value.
    pub fn build(
        param: &SearchParameterDefinition,
        modifier: Option<&SearchModifier>,
        value: &ReferenceValue,
        identity: &ServerIdentity,
    ) -> PredicateResult<RowCondition> {
        let type_modifier = match modifier {
            None => None,
            Some(SearchModifier::Type(target)) => {
                if !param.can_target(target) {
                    return Err(DefectError::InvalidChainTarget {
                        parameter: param.code.clone(),
                        target_type: target.clone(),
                        allowed: param.target.clone().unwrap_or_default(),
                    }
                    .into());
                }
                Some(target.as_str())
            }
            Some(other) => return Err(unsupported_modifier(param, other).into()),
        };

        let target_type = match (value.resource_type.as_deref(), type_modifier) {
            (Some(stated), Some(modified)) if stated != modified => {
                return Ok(RowCondition::False);
            }
            (Some(t), _) | (None, Some(t)) => Some(t),
            (None, None) => None,
        };

        let locality = match value.base_uri.as_deref() {
            Some(base) if !identity.is_local(Some(base)) => {
                RowCondition::eq(Field::ReferenceBaseUri, normalize_base(base))
            }
            _ => RowCondition::is_null(Field::ReferenceBaseUri),
        };

        Ok(RowCondition::and([
            locality,
            target_type
                .map(|t| RowCondition::eq(Field::ReferenceType, t))
                .unwrap_or(RowCondition::True),
            RowCondition::eq(Field::ReferenceId, value.id.as_str()),
            value
                .version
                .as_deref()
                .map(|v| RowCondition::eq(Field::ReferenceVersion, v))
                .unwrap_or(RowCondition::True),
        ]))
    }
}
