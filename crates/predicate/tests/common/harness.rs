//! Compile-and-evaluate harness.
//!
//! The harness owns an [`InMemoryIndexStore`] seeded by the test and a
//! [`PredicateCompiler`] resolving chains against it. `search` compiles the
//! criteria and evaluates the predicate against the store, which is how a
//! storage backend would consume it.

use std::collections::BTreeSet;
use std::sync::Arc;

use helios_predicate::search::{ResourceTypeRegistry, SearchParameterDefinition};
use helios_predicate::tenant::StaticIdentityProvider;
use helios_predicate::types::{Criterion, IndexRow, RecordVersion};
use helios_predicate::{
    CompilerConfig, IdentityCache, InMemoryIndexStore, IndexStore, Predicate, PredicateCompiler,
    PredicateResult, SearchContext, ServerIdentity, TenantId,
};

use super::fixtures::{RESOURCE_TYPES, SERVER_BASE};

/// A compiler wired to an in-memory index for one tenant.
pub struct TestHarness {
    /// The index the compiler resolves chains against.
    pub store: Arc<InMemoryIndexStore>,
    /// The compiler under test.
    pub compiler: PredicateCompiler,
    /// Tenant the rows are indexed for.
    pub tenant: TenantId,
}

impl TestHarness {
    /// Creates a harness with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CompilerConfig::default())
    }

    /// Creates a harness with a custom configuration.
    pub fn with_config(config: CompilerConfig) -> Self {
        let store = Arc::new(InMemoryIndexStore::new());
        let identity = ServerIdentity::parse(SERVER_BASE).expect("valid base url");
        let cache = Arc::new(IdentityCache::new(
            Arc::new(StaticIdentityProvider::new(identity)),
            config.identity_cache_ttl,
        ));
        let resource_types = ResourceTypeRegistry::with_types(RESOURCE_TYPES.iter().copied())
            .expect("valid resource types");
        let compiler = PredicateCompiler::new(store.clone(), cache, Arc::new(resource_types))
            .with_config(config)
            .expect("valid compiler config");

        Self {
            store,
            compiler,
            tenant: TenantId::new("test-tenant"),
        }
    }

    /// A fresh request context for the harness tenant.
    pub fn context(&self) -> SearchContext {
        SearchContext::new(self.tenant.clone())
    }

    /// Indexes version 1 of a record.
    pub fn index(
        &self,
        resource_type: &str,
        id: &str,
        rows: Vec<(&Arc<SearchParameterDefinition>, IndexRow)>,
    ) {
        self.index_version(resource_type, id, 1, rows);
    }

    /// Indexes a specific version of a record.
    pub fn index_version(
        &self,
        resource_type: &str,
        id: &str,
        version: u32,
        rows: Vec<(&Arc<SearchParameterDefinition>, IndexRow)>,
    ) {
        let rows = rows
            .into_iter()
            .map(|(param, row)| (param.id(), row))
            .collect();
        self.store
            .index_record(&self.tenant, RecordVersion::new(resource_type, id, version), rows);
    }

    /// Compiles criteria against the harness context.
    pub async fn compile(
        &self,
        resource_type: &str,
        criteria: &[Criterion],
    ) -> PredicateResult<Predicate> {
        self.compiler
            .compile(&self.context(), resource_type, criteria)
            .await
    }

    /// Compiles criteria and returns the ids of matching records.
    pub async fn search(&self, resource_type: &str, criteria: &[Criterion]) -> BTreeSet<String> {
        self.try_search(resource_type, criteria)
            .await
            .expect("search should compile")
    }

    /// Like [`search`](Self::search), returning compilation errors.
    pub async fn try_search(
        &self,
        resource_type: &str,
        criteria: &[Criterion],
    ) -> PredicateResult<BTreeSet<String>> {
        let ctx = self.context();
        let predicate = self.compiler.compile(&ctx, resource_type, criteria).await?;
        self.store.matching_ids(&ctx, resource_type, &predicate).await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds an id set from literals.
pub fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}
