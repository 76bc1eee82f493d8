//! Server identity resolution.
//!
//! A reference is *local* when it has no service base or when its base is the
//! server's own canonical base URL. The canonical base is configured per
//! tenant and looked up through an [`IdentityProvider`]; [`IdentityCache`]
//! keeps the answers for a bounded time so concurrent compilations share one
//! lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{BackendError, PredicateResult};

use super::id::TenantId;

/// The canonical base URL a server answers on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerIdentity(String);

impl ServerIdentity {
    /// Parses and normalizes a base URL (see [`normalize_base`]).
    pub fn parse(base_url: &str) -> Result<Self, url::ParseError> {
        let url = url::Url::parse(base_url)?;
        Ok(Self(url.as_str().trim_end_matches('/').to_string()))
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.0
    }

    /// Returns true if a reference with this service base points at this server.
    ///
    /// A missing base is always local.
    pub fn is_local(&self, base_uri: Option<&str>) -> bool {
        match base_uri {
            None => true,
            Some(base) => normalize_base(base) == self.0,
        }
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical form of a service base: scheme and host lowercased, default
/// port dropped, trailing slashes removed. Text that is not an absolute URL
/// only loses its trailing slashes.
pub fn normalize_base(base: &str) -> String {
    match url::Url::parse(base) {
        Ok(url) => url.as_str().trim_end_matches('/').to_string(),
        Err(_) => base.trim_end_matches('/').to_string(),
    }
}

/// Source of the primary server identity for a tenant.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves the identity, typically from configuration or storage.
    async fn primary_identity(&self, tenant: &TenantId) -> Result<ServerIdentity, BackendError>;
}

/// Provider backed by fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    default: Option<ServerIdentity>,
    per_tenant: HashMap<TenantId, ServerIdentity>,
}

impl StaticIdentityProvider {
    /// Creates a provider answering every tenant with `identity`.
    pub fn new(identity: ServerIdentity) -> Self {
        Self {
            default: Some(identity),
            per_tenant: HashMap::new(),
        }
    }

    /// Creates a provider that only knows explicitly added tenants.
    pub fn empty() -> Self {
        Self {
            default: None,
            per_tenant: HashMap::new(),
        }
    }

    /// Sets the identity of one tenant.
    pub fn with_tenant(mut self, tenant: TenantId, identity: ServerIdentity) -> Self {
        self.per_tenant.insert(tenant, identity);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn primary_identity(&self, tenant: &TenantId) -> Result<ServerIdentity, BackendError> {
        self.per_tenant
            .get(tenant)
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| BackendError::IdentityUnavailable {
                tenant_id: tenant.clone(),
                message: "no base URL configured".to_string(),
            })
    }
}

struct CachedIdentity {
    identity: ServerIdentity,
    fetched_at: Instant,
}

/// Read-mostly, per-tenant cache in front of an [`IdentityProvider`].
///
/// Entries expire after the configured TTL and can be invalidated explicitly.
/// The lock is never held across the provider call.
pub struct IdentityCache {
    provider: Arc<dyn IdentityProvider>,
    ttl: Duration,
    entries: RwLock<HashMap<TenantId, CachedIdentity>>,
}

impl IdentityCache {
    /// Creates a cache with the given entry lifetime.
    pub fn new(provider: Arc<dyn IdentityProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached identity for a tenant, fetching it when absent or expired.
    pub async fn primary_identity(&self, tenant: &TenantId) -> PredicateResult<ServerIdentity> {
        {
            let entries = self.entries.read();
            if let Some(cached) = entries.get(tenant)
                && cached.fetched_at.elapsed() < self.ttl
            {
                return Ok(cached.identity.clone());
            }
        }
        debug!(tenant = %tenant, "Identity cache miss");
        self.refresh(tenant).await
    }

    /// Fetches the identity from the provider and replaces the cached entry.
    pub async fn refresh(&self, tenant: &TenantId) -> PredicateResult<ServerIdentity> {
        let identity = self.provider.primary_identity(tenant).await?;
        debug!(tenant = %tenant, identity = %identity, "Identity cache refreshed");
        self.entries.write().insert(
            tenant.clone(),
            CachedIdentity {
                identity: identity.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(identity)
    }

    /// Drops the cached entry for a tenant.
    pub fn invalidate(&self, tenant: &TenantId) {
        self.entries.write().remove(tenant);
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of cached tenants, expired entries included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.read().len())
            .finish()
    }
}
