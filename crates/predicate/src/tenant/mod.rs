//! Tenant, identity and request context.
//!
//! # Core Types
//!
//! - [`TenantId`] - Opaque tenant identifier
//! - [`ServerIdentity`] - The canonical base URL that makes a reference local
//! - [`IdentityProvider`], [`IdentityCache`] - Async, cached identity lookup
//! - [`SearchContext`] - Tenant, identity override, cancellation and tracing
//!   data for one compilation
//!
//! Multi-tenant deployments either give every tenant its own identity through
//! the provider, or pass the identity explicitly on the context; the cache is
//! only consulted when the context carries none.

mod context;
mod id;
mod identity;

pub use context::SearchContext;
pub use id::{DEFAULT_TENANT, TenantId};
pub use identity::{
    IdentityCache, IdentityProvider, ServerIdentity, StaticIdentityProvider, normalize_base,
};
