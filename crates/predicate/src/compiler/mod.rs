//! The predicate compiler.
//!
//! [`PredicateCompiler`] turns the criteria of one search into a single
//! [`Predicate`] over the record-version index. Alternative values of a
//! criterion are ORed, separate criteria are ANDed.
//!
//! # Handlers
//!
//! | Type | Handler |
//! |------|---------|
//! | date | [`DateHandler`] |
//! | number | [`NumberHandler`] |
//! | quantity | [`QuantityHandler`] |
//! | token | [`TokenHandler`] |
//! | string | [`StringHandler`] |
//! | uri | [`UriHandler`] |
//! | reference | [`ReferenceHandler`] |
//! | any, with `:missing` | [`MissingHandler`] |
//!
//! Composite criteria, forward chains and `_has` reverse chains recurse into
//! the compiler itself. Chains resolve the remote side through the
//! [`IndexStore`] before the local predicate can be built, so compilation is
//! async and honours the caller's cancellation token at every level.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use helios_predicate::compiler::PredicateCompiler;
//! use helios_predicate::search::{ResourceTypeRegistry, SearchParameterDefinition};
//! use helios_predicate::store::InMemoryIndexStore;
//! use helios_predicate::tenant::{
//!     IdentityCache, SearchContext, ServerIdentity, StaticIdentityProvider,
//! };
//! use helios_predicate::types::{Criterion, SearchParamType, SearchValue};
//!
//! # tokio_test::block_on(async {
//! let identity = ServerIdentity::parse("https://acme.org/fhir").unwrap();
//! let compiler = PredicateCompiler::new(
//!     Arc::new(InMemoryIndexStore::new()),
//!     Arc::new(IdentityCache::new(
//!         Arc::new(StaticIdentityProvider::new(identity)),
//!         Duration::from_secs(300),
//!     )),
//!     Arc::new(ResourceTypeRegistry::with_types(["Observation", "Patient"]).unwrap()),
//! );
//!
//! let code = Arc::new(
//!     SearchParameterDefinition::new(
//!         "http://hl7.org/fhir/SearchParameter/clinical-code",
//!         "code",
//!         SearchParamType::Token,
//!         "Observation.code",
//!     )
//!     .with_base(vec!["Observation"]),
//! );
//! let criteria = vec![Criterion::new(code).with_value(SearchValue::token("http://loinc.org|1234-5"))];
//!
//! let predicate = compiler
//!     .compile(&SearchContext::default(), "Observation", &criteria)
//!     .await
//!     .unwrap();
//! assert!(predicate.to_string().starts_with("EXISTS(token_index"));
//! # });
//! ```

mod chain;
mod composite;
mod date;
mod missing;
mod number;
mod quantity;
mod reference;
mod reverse_chain;
mod string;
mod token;
mod uri;

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use crate::config::{CompilerConfig, ConfigError};
use crate::error::{DefectError, PredicateResult};
use crate::predicate::{Predicate, RowCondition, collapse_reference_sets};
use crate::search::{ResourceTypeRegistry, SearchParameterDefinition};
use crate::store::IndexStore;
use crate::tenant::{IdentityCache, SearchContext, ServerIdentity};
use crate::types::{
    Criterion, IndexTable, QuantityValue, SearchModifier, SearchParamType, SearchValue,
};

pub use date::DateHandler;
pub use missing::MissingHandler;
pub use number::NumberHandler;
pub use quantity::QuantityHandler;
pub use reference::ReferenceHandler;
pub use string::StringHandler;
pub use token::TokenHandler;
pub use uri::UriHandler;

/// Compiles search criteria into index predicates.
///
/// A compiler is shared by all requests; per-request state lives in the
/// [`SearchContext`] and in a private per-call scratch area, so concurrent
/// compilations never contend.
pub struct PredicateCompiler {
    config: CompilerConfig,
    store: Arc<dyn IndexStore>,
    identity: Arc<IdentityCache>,
    resource_types: Arc<ResourceTypeRegistry>,
}

/// Hops taken so far, counted separately for each chain direction.
#[derive(Debug, Clone, Copy, Default)]
struct Depth {
    forward: usize,
    reverse: usize,
}

/// State of one top-level `compile` call.
struct Compilation<'a> {
    ctx: &'a SearchContext,
    identity: OnceCell<ServerIdentity>,
}

impl<'a> Compilation<'a> {
    fn new(ctx: &'a SearchContext) -> Self {
        Self {
            ctx,
            identity: OnceCell::new(),
        }
    }

    /// The server identity: the context override if present, else the cached
    /// one, looked up at most once per compilation.
    async fn identity(&self, cache: &IdentityCache) -> PredicateResult<&ServerIdentity> {
        if let Some(identity) = self.ctx.identity() {
            return Ok(identity);
        }
        self.identity
            .get_or_try_init(|| {
                self.ctx
                    .run_cancellable(cache.primary_identity(self.ctx.tenant_id()))
            })
            .await
    }
}

impl PredicateCompiler {
    /// Creates a compiler with the default configuration.
    pub fn new(
        store: Arc<dyn IndexStore>,
        identity: Arc<IdentityCache>,
        resource_types: Arc<ResourceTypeRegistry>,
    ) -> Self {
        Self {
            config: CompilerConfig::default(),
            store,
            identity,
            resource_types,
        }
    }

    /// Replaces the configuration after validating it.
    pub fn with_config(mut self, config: CompilerConfig) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError::Invalid)?;
        self.config = config;
        Ok(self)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Returns the index store used for chain resolution.
    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    /// Returns the identity cache.
    pub fn identity_cache(&self) -> &Arc<IdentityCache> {
        &self.identity
    }

    /// Returns the resource type registry.
    pub fn resource_types(&self) -> &ResourceTypeRegistry {
        &self.resource_types
    }

    /// Compiles the criteria of one search on `resource_type`.
    ///
    /// No criteria compile to [`Predicate::True`]. Defects, depth violations,
    /// collaborator failures and cancellation abort the whole compilation;
    /// a partial predicate is never returned.
    pub async fn compile(
        &self,
        ctx: &SearchContext,
        resource_type: &str,
        criteria: &[Criterion],
    ) -> PredicateResult<Predicate> {
        self.require_type(resource_type)?;

        debug!(
            resource_type,
            criteria = criteria.len(),
            chain_depth = criteria.iter().map(Criterion::chain_depth).max().unwrap_or(0),
            tenant = %ctx.tenant_id(),
            correlation_id = ctx.correlation_id().unwrap_or("-"),
            "Compiling search predicate"
        );

        let run = Compilation::new(ctx);
        let mut predicate = self
            .compile_criteria(&run, resource_type, criteria, Depth::default())
            .await?;
        if self.config.collapse_reference_sets {
            predicate = collapse_reference_sets(predicate);
        }

        debug!(
            resource_type,
            nodes = predicate.node_count(),
            "Compiled search predicate"
        );
        Ok(predicate)
    }

    /// ANDs the criteria, each compiled to the OR of its values.
    fn compile_criteria<'a>(
        &'a self,
        run: &'a Compilation<'a>,
        resource_type: &'a str,
        criteria: &'a [Criterion],
        depth: Depth,
    ) -> BoxFuture<'a, PredicateResult<Predicate>> {
        async move {
            run.ctx.check_cancelled()?;

            let (chained, direct): (Vec<&Criterion>, Vec<&Criterion>) =
                criteria.iter().partition(|c| c.is_chained());

            let mut parts = Vec::with_capacity(criteria.len());
            for criterion in direct {
                self.validate(resource_type, criterion)?;
                let part = self.compile_direct(run, criterion).await?;
                trace!(resource_type, parameter = criterion.code(), "Compiled criterion");
                parts.push(part);
            }

            for criterion in chained {
                self.validate(resource_type, criterion)?;
                let part = if let Some(link) = &criterion.chain {
                    chain::compile(self, run, resource_type, criterion, link, depth).await?
                } else if criterion.param_type() == SearchParamType::Composite {
                    composite::compile(self, run, resource_type, criterion, depth).await?
                } else {
                    reverse_chain::compile(self, run, resource_type, criterion, depth).await?
                };
                trace!(
                    resource_type,
                    parameter = criterion.code(),
                    "Compiled chained criterion"
                );
                parts.push(part);
            }

            Ok(Predicate::and(parts))
        }
        .boxed()
    }

    /// Compiles a criterion that maps onto a single index table.
    async fn compile_direct(
        &self,
        run: &Compilation<'_>,
        criterion: &Criterion,
    ) -> PredicateResult<Predicate> {
        if criterion.is_missing() {
            return MissingHandler::build(criterion);
        }

        let param = criterion.parameter.as_ref();
        let table = IndexTable::for_param_type(param.param_type).ok_or_else(|| {
            DefectError::ValueTypeMismatch {
                parameter: param.code.clone(),
                expected: param.param_type,
                found: "unindexed".to_string(),
            }
        })?;
        let modifier = criterion.modifier.as_ref();
        let margin = self.config.approximate_margin();

        let mut alternatives = Vec::with_capacity(criterion.values.len());
        for value in &criterion.values {
            let alternative = match (param.param_type, value) {
                (SearchParamType::Date, SearchValue::Date(v)) => DateHandler::build(param, v)?,
                (SearchParamType::Number, SearchValue::Number(v)) => {
                    NumberHandler::build(param, v, margin)?
                }
                (SearchParamType::Quantity, SearchValue::Quantity(v)) => {
                    QuantityHandler::build(param, v, margin)?
                }
                (SearchParamType::Quantity, SearchValue::Number(v)) => {
                    QuantityHandler::build(param, &QuantityValue::from(v.clone()), margin)?
                }
                (SearchParamType::Token, SearchValue::Token(v)) => TokenHandler::build(v),
                (SearchParamType::String, SearchValue::String(v)) => {
                    StringHandler::build(param, modifier, v)?
                }
                (SearchParamType::Uri, SearchValue::Uri(v)) => UriHandler::build(param, modifier, v)?,
                (SearchParamType::Reference, SearchValue::Reference(v)) => {
                    let identity = run.identity(&self.identity).await?;
                    ReferenceHandler::build(param, modifier, v, identity)?
                }
                (_, other) => return Err(value_mismatch(param, other).into()),
            };
            alternatives.push(alternative);
        }

        Ok(Predicate::exists(
            table,
            param.id(),
            RowCondition::or(alternatives),
        ))
    }

    /// Checks a criterion against its parameter's declared contract.
    fn validate(&self, resource_type: &str, criterion: &Criterion) -> PredicateResult<()> {
        let param = criterion.parameter.as_ref();

        if !param.applies_to(resource_type) {
            return Err(DefectError::ParameterNotOnType {
                parameter: param.code.clone(),
                source_type: resource_type.to_string(),
                allowed: param.base.clone(),
            }
            .into());
        }
        require_usable(param)?;

        if let Some(modifier) = &criterion.modifier {
            if param.is_composite() {
                return Err(DefectError::ModifierOnComposite {
                    parameter: param.code.clone(),
                    modifier: modifier.to_string(),
                }
                .into());
            }
            if !param.legal_modifiers().contains(&modifier.kind()) {
                return Err(unsupported_modifier(param, modifier).into());
            }
        }

        // Chains validate their own link; `:missing` validates its own values.
        if criterion.chain.is_some() || criterion.is_missing() {
            return Ok(());
        }

        if criterion.values.is_empty() {
            return Err(DefectError::MissingValue {
                parameter: param.code.clone(),
            }
            .into());
        }

        let legal = param.legal_prefixes();
        for value in &criterion.values {
            if let Some(prefix) = value.prefix()
                && !legal.contains(&prefix)
            {
                return Err(DefectError::UnsupportedPrefix {
                    parameter: param.code.clone(),
                    param_type: param.param_type,
                    prefix: prefix.to_string(),
                    allowed: legal.iter().map(ToString::to_string).collect(),
                }
                .into());
            }
            if !accepts(param.param_type, value) {
                return Err(value_mismatch(param, value).into());
            }
        }
        Ok(())
    }

    fn require_type(&self, resource_type: &str) -> PredicateResult<()> {
        if self.resource_types.contains(resource_type) {
            Ok(())
        } else {
            Err(DefectError::UnknownResourceType {
                resource_type: resource_type.to_string(),
            }
            .into())
        }
    }
}

impl std::fmt::Debug for PredicateCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateCompiler")
            .field("config", &self.config)
            .field("store", &self.store.store_name())
            .field("resource_types", &self.resource_types.len())
            .finish()
    }
}

/// Whether a value's shape fits the declared parameter type.
fn accepts(param_type: SearchParamType, value: &SearchValue) -> bool {
    matches!(
        (param_type, value),
        (SearchParamType::Date, SearchValue::Date(_))
            | (SearchParamType::Number, SearchValue::Number(_))
            | (
                SearchParamType::Quantity,
                SearchValue::Quantity(_) | SearchValue::Number(_)
            )
            | (SearchParamType::Token, SearchValue::Token(_))
            | (SearchParamType::String, SearchValue::String(_))
            | (SearchParamType::Uri, SearchValue::Uri(_))
            | (SearchParamType::Reference, SearchValue::Reference(_))
            | (SearchParamType::Composite, SearchValue::Composite(_))
            | (SearchParamType::Special, SearchValue::Has(_))
    )
}

/// Rejects parameters whose status does not allow searching.
pub(crate) fn require_usable(param: &SearchParameterDefinition) -> Result<(), DefectError> {
    if param.status.is_usable() {
        Ok(())
    } else {
        Err(DefectError::ParameterNotUsable {
            parameter: param.code.clone(),
            status: param.status,
        })
    }
}

pub(crate) fn unsupported_modifier(
    param: &SearchParameterDefinition,
    modifier: &SearchModifier,
) -> DefectError {
    DefectError::UnsupportedModifier {
        parameter: param.code.clone(),
        param_type: param.param_type,
        modifier: modifier.to_string(),
        allowed: param
            .legal_modifiers()
            .iter()
            .map(ToString::to_string)
            .collect(),
    }
}

pub(crate) fn value_mismatch(param: &SearchParameterDefinition, value: &SearchValue) -> DefectError {
    DefectError::ValueTypeMismatch {
        parameter: param.code.clone(),
        expected: param.param_type,
        found: value.kind_name().to_string(),
    }
}
