//! Error types for the predicate compiler.
//!
//! Compilation fails for exactly two families of reasons: a *defect* in the
//! criteria handed to the compiler (something the upstream parser should have
//! rejected), or a collaborator failure (identity lookup, index store,
//! cancellation). An empty result is never an error; it compiles to a
//! predicate that matches nothing or everything.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::search::SearchParameterStatus;
use crate::tenant::TenantId;
use crate::types::SearchParamType;

/// The primary error type for predicate compilation.
#[derive(Error, Debug)]
pub enum PredicateError {
    /// Criteria that violate the declared parameter contract
    #[error(transparent)]
    Defect(#[from] DefectError),

    /// Chained and reverse-chained traversal errors
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// The caller cancelled the compilation
    #[error("predicate compilation cancelled")]
    Cancelled,

    /// Collaborator failures
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl PredicateError {
    /// Returns true if this error is an internal defect rather than an
    /// environmental failure.
    pub fn is_defect(&self) -> bool {
        matches!(self, PredicateError::Defect(_))
    }

    /// Returns true if compilation was aborted by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PredicateError::Cancelled)
    }
}

/// Fatal defects in the criteria supplied to the compiler.
///
/// These are never recoverable at this layer. Each message names the offending
/// parameter, the offending modifier or comparator, and what would have been
/// legal instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefectError {
    /// Modifier not legal for the parameter.
    #[error(
        "unsupported modifier ':{modifier}' on {param_type} parameter '{parameter}' (allowed: {})",
        list_or_none(.allowed)
    )]
    UnsupportedModifier {
        parameter: String,
        param_type: SearchParamType,
        modifier: String,
        allowed: Vec<String>,
    },

    /// Parameter whose status does not allow searching.
    #[error("parameter '{parameter}' is {status} and cannot be searched (allowed: active)")]
    ParameterNotUsable {
        parameter: String,
        status: SearchParameterStatus,
    },

    /// Comparator prefix not legal for the parameter.
    #[error(
        "unsupported comparator '{prefix}' on {param_type} parameter '{parameter}' (allowed: {})",
        list_or_none(.allowed)
    )]
    UnsupportedPrefix {
        parameter: String,
        param_type: SearchParamType,
        prefix: String,
        allowed: Vec<String>,
    },

    /// No value supplied outside the Missing branch.
    #[error(
        "parameter '{parameter}' has no value; a value is required unless ':missing' is used"
    )]
    MissingValue { parameter: String },

    /// Comparator combined with the Missing modifier.
    #[error(
        "comparator '{prefix}' cannot be combined with ':missing' on parameter '{parameter}' (allowed: true, false)"
    )]
    ComparatorOnMissing { parameter: String, prefix: String },

    /// A numeric value whose implied precision cannot be represented.
    #[error("malformed numeric scale for parameter '{parameter}': {value} (maximum scale {max_scale})")]
    InvalidScale {
        parameter: String,
        value: String,
        max_scale: u32,
    },

    /// A value whose shape does not match the declared parameter type.
    #[error("parameter '{parameter}' is declared {expected} but received a {found} value")]
    ValueTypeMismatch {
        parameter: String,
        expected: SearchParamType,
        found: String,
    },

    /// Modifier on a composite criterion.
    #[error(
        "modifier ':{modifier}' is not allowed on composite parameter '{parameter}' (allowed: none)"
    )]
    ModifierOnComposite { parameter: String, modifier: String },

    /// Chain or reverse chain through a non-reference parameter.
    #[error("parameter '{parameter}' is declared {param_type}; only reference parameters can be chained")]
    NotAReference {
        parameter: String,
        param_type: SearchParamType,
    },

    /// Resource type unknown to the resource type registry.
    #[error("unknown resource type '{resource_type}'")]
    UnknownResourceType { resource_type: String },

    /// Chain target not among the parameter's declared targets.
    #[error(
        "parameter '{parameter}' cannot reference '{target_type}' (allowed: {})",
        list_or_none(.allowed)
    )]
    InvalidChainTarget {
        parameter: String,
        target_type: String,
        allowed: Vec<String>,
    },

    /// Reference parameter that does not belong to the reverse-chain source type.
    #[error("parameter '{parameter}' is not defined on '{source_type}' (defined on: {})", list_or_none(.allowed))]
    ParameterNotOnType {
        parameter: String,
        source_type: String,
        allowed: Vec<String>,
    },
}

/// Errors raised while traversing chains.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Forward chain longer than the configured maximum.
    #[error("chain depth {depth} exceeds maximum of {max} at parameter '{parameter}'")]
    MaxDepthExceeded {
        parameter: String,
        depth: usize,
        max: usize,
    },

    /// `_has` chain longer than the configured maximum.
    #[error("reverse chain depth {depth} exceeds maximum of {max} at '{source_type}:{parameter}'")]
    MaxReverseDepthExceeded {
        source_type: String,
        parameter: String,
        depth: usize,
        max: usize,
    },

    /// Chain link that carries no remote criteria.
    #[error("chained parameter '{parameter}' has no criteria for '{target_type}'")]
    EmptyChain {
        parameter: String,
        target_type: String,
    },
}

/// Collaborator failures.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The server identity could not be resolved for a tenant.
    #[error("server identity unavailable for tenant {tenant_id}: {message}")]
    IdentityUnavailable { tenant_id: TenantId, message: String },

    /// The index store failed a sub-query.
    #[error("index store error in {store_name}: {message}")]
    Store {
        store_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed index data encountered while evaluating.
    #[error("invalid index data for {resource_type}/{resource_id}: {message}")]
    InvalidIndexData {
        resource_type: String,
        resource_id: String,
        message: String,
    },
}

/// Result type alias for compilation.
pub type PredicateResult<T> = Result<T, PredicateError>;

fn list_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.join(", ")
    }
}
