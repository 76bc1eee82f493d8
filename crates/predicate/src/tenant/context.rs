//! Per-request compilation context.

use tokio_util::sync::CancellationToken;

use super::id::TenantId;
use super::identity::ServerIdentity;
use crate::error::{PredicateError, PredicateResult};

/// Everything a compilation needs to know about the request it serves.
///
/// A context carries the tenant, an optional explicit server identity (which
/// takes precedence over the shared [`IdentityCache`](super::IdentityCache)),
/// the caller's cancellation token and an optional correlation id for tracing.
///
/// ```
/// use helios_predicate::tenant::{SearchContext, ServerIdentity, TenantId};
///
/// let ctx = SearchContext::new(TenantId::new("acme"))
///     .with_identity(ServerIdentity::parse("https://acme.org/fhir").unwrap())
///     .with_correlation_id("req-42");
/// assert_eq!(ctx.correlation_id(), Some("req-42"));
/// ```
#[derive(Debug, Clone)]
pub struct SearchContext {
    tenant_id: TenantId,
    identity: Option<ServerIdentity>,
    cancel: CancellationToken,
    correlation_id: Option<String>,
}

impl SearchContext {
    /// Creates a context for a tenant with a fresh cancellation token.
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            identity: None,
            cancel: CancellationToken::new(),
            correlation_id: None,
        }
    }

    /// Uses an explicit server identity instead of the shared cache.
    pub fn with_identity(mut self, identity: ServerIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Uses the caller's cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Sets the correlation ID for tracing.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Returns the tenant ID.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the explicit identity, if set.
    pub fn identity(&self) -> Option<&ServerIdentity> {
        self.identity.as_ref()
    }

    /// Returns the cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the correlation ID, if set.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Returns true once the caller has cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fails with [`PredicateError::Cancelled`] once the caller has cancelled.
    pub fn check_cancelled(&self) -> PredicateResult<()> {
        if self.cancel.is_cancelled() {
            Err(PredicateError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Awaits `fut`, aborting early if the caller cancels first.
    pub async fn run_cancellable<T, F>(&self, fut: F) -> PredicateResult<T>
    where
        F: std::future::Future<Output = PredicateResult<T>>,
    {
        self.check_cancelled()?;
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(PredicateError::Cancelled),
            r = fut => r,
        };
        self.check_cancelled()?;
        result
    }
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::new(TenantId::default())
    }
}
