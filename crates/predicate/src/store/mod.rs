//! Index store collaborator.
//!
//! Chained and reverse-chained criteria cannot be expressed as a single row
//! condition: the compiler has to know which remote records match before it
//! can say which local references qualify. It asks an [`IndexStore`] for those
//! id sets. Implementations are read-only from the compiler's perspective.

mod memory;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::PredicateResult;
use crate::predicate::Predicate;
use crate::tenant::SearchContext;
use crate::types::SearchParamId;

pub use memory::InMemoryIndexStore;

/// Read-only access to the per-type index tables.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Name used in logs and errors.
    fn store_name(&self) -> &'static str;

    /// Logical ids of current `resource_type` records matching `predicate`.
    async fn matching_ids(
        &self,
        ctx: &SearchContext,
        resource_type: &str,
        predicate: &Predicate,
    ) -> PredicateResult<BTreeSet<String>>;

    /// Logical ids of `target_type` records that the `sources` records of
    /// `source_type` reference, locally, through `param_id`.
    async fn referenced_ids(
        &self,
        ctx: &SearchContext,
        source_type: &str,
        param_id: &SearchParamId,
        sources: &BTreeSet<String>,
        target_type: &str,
    ) -> PredicateResult<BTreeSet<String>>;
}
