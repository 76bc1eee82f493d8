//! Reverse chains: `Patient?_has:Observation:subject:code=1234-5`.
//!
//! Each hop finds the source records matching the hop's condition, then asks
//! the index store which records of the current type they reference. A nested
//! hop makes the source type the current type of the next one.

use futures::future::{BoxFuture, FutureExt};
use tracing::{trace, warn};

use crate::error::{ChainError, DefectError, PredicateResult};
use crate::predicate::Predicate;
use crate::types::{Criterion, ReverseChain, ReverseChainCondition, SearchParamType, SearchValue};

use super::{Compilation, Depth, PredicateCompiler, require_usable, value_mismatch};

/// ORs the `_has` values of one criterion.
pub(super) async fn compile(
    compiler: &PredicateCompiler,
    run: &Compilation<'_>,
    resource_type: &str,
    criterion: &Criterion,
    depth: Depth,
) -> PredicateResult<Predicate> {
    let mut alternatives = Vec::with_capacity(criterion.values.len());
    for value in &criterion.values {
        let SearchValue::Has(reverse) = value else {
            return Err(value_mismatch(&criterion.parameter, value).into());
        };
        alternatives.push(resolve(compiler, run, resource_type, reverse, depth).await?);
    }
    Ok(Predicate::or(alternatives))
}

fn resolve<'a>(
    compiler: &'a PredicateCompiler,
    run: &'a Compilation<'a>,
    target_type: &'a str,
    reverse: &'a ReverseChain,
    depth: Depth,
) -> BoxFuture<'a, PredicateResult<Predicate>> {
    async move {
        run.ctx.check_cancelled()?;
        let param = reverse.reference_param.as_ref();

        let hop = depth.reverse + 1;
        let max = compiler.config.max_reverse_chain_depth;
        if hop > max {
            warn!(
                target_type,
                source_type = %reverse.source_type,
                parameter = %param.code,
                depth = hop,
                max,
                "Rejecting reverse chain deeper than the configured maximum"
            );
            return Err(ChainError::MaxReverseDepthExceeded {
                source_type: reverse.source_type.clone(),
                parameter: param.code.clone(),
                depth: hop,
                max,
            }
            .into());
        }

        compiler.require_type(&reverse.source_type)?;
        if param.param_type != SearchParamType::Reference {
            return Err(DefectError::NotAReference {
                parameter: param.code.clone(),
                param_type: param.param_type,
            }
            .into());
        }
        require_usable(param)?;
        if !param.applies_to(&reverse.source_type) {
            return Err(DefectError::ParameterNotOnType {
                parameter: param.code.clone(),
                source_type: reverse.source_type.clone(),
                allowed: param.base.clone(),
            }
            .into());
        }
        if !param.can_target(target_type) {
            return Err(DefectError::InvalidChainTarget {
                parameter: param.code.clone(),
                target_type: target_type.to_string(),
                allowed: param.target.clone().unwrap_or_default(),
            }
            .into());
        }

        let inner = Depth {
            reverse: hop,
            ..depth
        };
        let source_predicate = match &reverse.condition {
            ReverseChainCondition::Criterion(criterion) => {
                compiler
                    .compile_criteria(
                        run,
                        &reverse.source_type,
                        std::slice::from_ref(criterion.as_ref()),
                        inner,
                    )
                    .await?
            }
            ReverseChainCondition::Nested(next) => {
                resolve(compiler, run, &reverse.source_type, next, inner).await?
            }
        };

        let sources = run
            .ctx
            .run_cancellable(compiler.store.matching_ids(
                run.ctx,
                &reverse.source_type,
                &source_predicate,
            ))
            .await?;
        if sources.is_empty() {
            trace!(
                target_type,
                source_type = %reverse.source_type,
                "No source records for reverse chain"
            );
            return Ok(Predicate::False);
        }

        let param_id = param.id();
        let targets = run
            .ctx
            .run_cancellable(compiler.store.referenced_ids(
                run.ctx,
                &reverse.source_type,
                &param_id,
                &sources,
                target_type,
            ))
            .await?;
        trace!(
            target_type,
            source_type = %reverse.source_type,
            sources = sources.len(),
            targets = targets.len(),
            "Resolved reverse chain hop"
        );
        Ok(Predicate::resource_id_in(targets))
    }
    .boxed()
}
