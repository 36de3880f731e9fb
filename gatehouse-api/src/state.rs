//! Shared application state for Axum routers.

use std::sync::Arc;

use gatehouse_gateway::Gateway;
use gatehouse_limiter::RateLimiter;
use gatehouse_policy::{EffectivePolicyResolver, OverrideEngine, PolicyService};
use gatehouse_storage::Storage;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub policies: Arc<PolicyService>,
    pub overrides: Arc<OverrideEngine>,
    pub resolver: Arc<EffectivePolicyResolver>,
    /// Storage handle for readiness probes
    pub storage: Arc<dyn Storage>,
    /// Limiter handle for readiness probes
    pub limiter: Arc<RateLimiter>,
    pub start_time: std::time::Instant,
}

// Use macro to reduce boilerplate for FromRef implementations
crate::impl_from_ref!(Arc<Gateway>, gateway);
crate::impl_from_ref!(Arc<PolicyService>, policies);
crate::impl_from_ref!(Arc<OverrideEngine>, overrides);
crate::impl_from_ref!(Arc<EffectivePolicyResolver>, resolver);
crate::impl_from_ref!(Arc<dyn Storage>, storage);
crate::impl_from_ref!(Arc<RateLimiter>, limiter);
crate::impl_from_ref!(std::time::Instant, start_time);
