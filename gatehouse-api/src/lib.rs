//! Gatehouse API - REST API Layer
//!
//! This crate exposes the Gatehouse policy governance service over HTTP:
//! the pre-check/audit protocol for LLM gateways, and the policy library
//! admin surface. Handlers delegate to the domain crates; transport
//! concerns (headers, envelopes, status codes, CORS, transport limits)
//! live here.

pub mod config;
pub mod error;
pub mod macros;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

#[cfg(feature = "openapi")]
pub mod openapi;

// Re-export commonly used types
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{
    transport_rate_limit_middleware, RateLimitKey, RateLimitState, TenantContext,
    ORGANIZATION_HEADER, TENANT_HEADER, USER_HEADER,
};
pub use routes::create_api_router;
pub use state::AppState;
pub use telemetry::init_tracing;
pub use types::*;

#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
