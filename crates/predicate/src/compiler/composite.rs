//! Composite criteria: OR across value groups, AND within a group.

use crate::error::PredicateResult;
use crate::predicate::Predicate;
use crate::types::{Criterion, SearchValue};

use super::{Compilation, Depth, PredicateCompiler, value_mismatch};

pub(super) async fn compile(
    compiler: &PredicateCompiler,
    run: &Compilation<'_>,
    resource_type: &str,
    criterion: &Criterion,
    depth: Depth,
) -> PredicateResult<Predicate> {
    let mut groups = Vec::with_capacity(criterion.values.len());
    for value in &criterion.values {
        let SearchValue::Composite(group) = value else {
            return Err(value_mismatch(&criterion.parameter, value).into());
        };
        groups.push(
            compiler
                .compile_criteria(run, resource_type, &group.criteria, depth)
                .await?,
        );
    }
    Ok(Predicate::or(groups))
}
