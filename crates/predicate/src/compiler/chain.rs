//! Forward chains: `Observation?subject:Patient.name=Smith`.
//!
//! The remote criteria are compiled against the target type, evaluated by the
//! index store, and the local predicate becomes "a reference row of this
//! parameter points at one of those ids".

use std::collections::BTreeSet;

use tracing::{trace, warn};

use crate::error::{ChainError, DefectError, PredicateResult};
use crate::predicate::{Field, Operand, Predicate, RowCondition};
use crate::types::{ChainLink, Criterion, IndexTable, ModifierKind, SearchModifier, SearchParamType};

use super::{Compilation, Depth, PredicateCompiler};

pub(super) async fn compile(
    compiler: &PredicateCompiler,
    run: &Compilation<'_>,
    resource_type: &str,
    criterion: &Criterion,
    link: &ChainLink,
    depth: Depth,
) -> PredicateResult<Predicate> {
    let param = criterion.parameter.as_ref();

    if param.param_type != SearchParamType::Reference {
        return Err(DefectError::NotAReference {
            parameter: param.code.clone(),
            param_type: param.param_type,
        }
        .into());
    }

    match &criterion.modifier {
        None => {}
        Some(SearchModifier::Type(t)) if *t == link.target_type => {}
        Some(SearchModifier::Type(t)) => {
            return Err(DefectError::InvalidChainTarget {
                parameter: param.code.clone(),
                target_type: t.clone(),
                allowed: vec![link.target_type.clone()],
            }
            .into());
        }
        Some(other) => {
            return Err(DefectError::UnsupportedModifier {
                parameter: param.code.clone(),
                param_type: param.param_type,
                modifier: other.to_string(),
                allowed: vec![ModifierKind::Type.to_string()],
            }
            .into());
        }
    }

    compiler.require_type(&link.target_type)?;
    if !param.can_target(&link.target_type) {
        return Err(DefectError::InvalidChainTarget {
            parameter: param.code.clone(),
            target_type: link.target_type.clone(),
            allowed: param.target.clone().unwrap_or_default(),
        }
        .into());
    }

    let hop = depth.forward + 1;
    let max = compiler.config.max_chain_depth;
    if hop > max {
        warn!(
            resource_type,
            parameter = %param.code,
            depth = hop,
            max,
            "Rejecting chain deeper than the configured maximum"
        );
        return Err(ChainError::MaxDepthExceeded {
            parameter: param.code.clone(),
            depth: hop,
            max,
        }
        .into());
    }

    if link.criteria.is_empty() {
        return Err(ChainError::EmptyChain {
            parameter: param.code.clone(),
            target_type: link.target_type.clone(),
        }
        .into());
    }

    let remote = compiler
        .compile_criteria(
            run,
            &link.target_type,
            &link.criteria,
            Depth {
                forward: hop,
                ..depth
            },
        )
        .await?;

    let ids = run
        .ctx
        .run_cancellable(compiler.store.matching_ids(run.ctx, &link.target_type, &remote))
        .await?;
    trace!(
        resource_type,
        parameter = %param.code,
        target_type = %link.target_type,
        matched = ids.len(),
        "Resolved chain link"
    );

    let ids: BTreeSet<Operand> = ids.into_iter().map(Operand::Text).collect();
    Ok(Predicate::exists(
        IndexTable::Reference,
        param.id(),
        RowCondition::and([
            RowCondition::is_null(Field::ReferenceBaseUri),
            RowCondition::eq(Field::ReferenceType, link.target_type.as_str()),
            RowCondition::one_of(Field::ReferenceId, ids),
        ]),
    ))
}
