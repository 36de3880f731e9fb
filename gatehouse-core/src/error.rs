//! Error types for Gatehouse operations

use crate::{ContextId, OverrideScope, PolicyAction};
use thiserror::Error;

/// Pattern validation errors (C1).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("Pattern is empty or whitespace-only")]
    Empty,

    #[error("Pattern is {length} characters, maximum is {max}")]
    TooLong { length: usize, max: usize },

    #[error("Pattern has {count} capture groups, maximum is {max}")]
    TooManyGroups { count: usize, max: usize },

    #[error("Pattern failed to compile: {reason}")]
    InvalidSyntax { reason: String },

    #[error("Pattern contains a dangerous construct: {construct}")]
    DangerousShape { construct: String },

    #[error("Pattern match exceeded the {budget_ms}ms budget")]
    Timeout { budget_ms: u64 },
}

impl PatternError {
    /// Stable machine-readable code for the API surface.
    pub fn code(&self) -> &'static str {
        match self {
            PatternError::Empty => "empty",
            PatternError::TooLong { .. } => "too_long",
            PatternError::TooManyGroups { .. } => "too_many_groups",
            PatternError::InvalidSyntax { .. } => "invalid_syntax",
            PatternError::DangerousShape { .. } => "dangerous_shape",
            PatternError::Timeout { .. } => "timeout",
        }
    }
}

/// Policy store errors (C3).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PolicyError {
    #[error("System-tier policies cannot be created through the API")]
    SystemTierCreation,

    #[error("Organization-tier policies require an Enterprise license")]
    OrgTierRequiresEnterprise,

    #[error("Tenant policy limit of {limit} reached for tenant {tenant_id}")]
    TenantPolicyLimitReached { tenant_id: String, limit: usize },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    #[error("Unknown policy category: {category}")]
    InvalidCategory { category: String },

    #[error("Invalid policy tier: {reason}")]
    InvalidTier { reason: String },

    #[error("System policy {policy_id} cannot be modified")]
    SystemPolicyModification { policy_id: String },

    #[error("System policy {policy_id} cannot be deleted")]
    SystemPolicyDeletion { policy_id: String },

    #[error("Policy not found: {id}")]
    NotFound { id: String },
}

/// Override engine errors (C4).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OverrideError {
    #[error("Override reason must not be empty")]
    ReasonRequired,

    #[error("Override action {requested} is weaker than base action {base}")]
    InvalidAction {
        base: PolicyAction,
        requested: PolicyAction,
    },

    #[error("Policy overrides require an Enterprise license")]
    RequiresEnterprise,

    #[error("Policy {policy_id} is not a system policy; only system policies can be overridden")]
    OnlySystemPolicies { policy_id: String },

    #[error("An active override already exists for {policy_id} at scope {scope}")]
    AlreadyExists {
        policy_id: String,
        scope: OverrideScope,
    },

    #[error("Override not found: {id}")]
    NotFound { id: String },

    #[error("Target policy not found: {policy_id}")]
    PolicyNotFound { policy_id: String },
}

/// Shared-cache errors surfaced by the rate limiter (C2).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache command failed: {reason}")]
    Command { reason: String },

    #[error("Invalid cache URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Storage operation failed: {reason}")]
    Internal { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Operation cancelled")]
    Cancelled,
}

/// Context token errors (C7).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("Context not found: {context_id}")]
    NotFound { context_id: ContextId },

    #[error("Context expired: {context_id}")]
    Expired { context_id: ContextId },

    #[error("Context {context_id} is bound to a different client")]
    ClientMismatch { context_id: ContextId },

    #[error("Context {context_id} was denied at pre-check and cannot be audited")]
    NotApproved { context_id: ContextId },
}

/// Audit recording errors (C8).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuditError {
    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Token counter {field} must be non-negative")]
    NegativeTokens { field: String },

    #[error("Context validation failed: {0}")]
    Context(#[from] ContextError),
}

/// Master error type for all Gatehouse errors.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Override error: {0}")]
    Override(#[from] OverrideError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),
}

impl GatewayError {
    /// Shorthand for a bad-request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        GatewayError::BadRequest {
            message: message.into(),
        }
    }
}

/// Result type alias for Gatehouse operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_error_codes() {
        assert_eq!(PatternError::Empty.code(), "empty");
        assert_eq!(
            PatternError::TooLong {
                length: 1001,
                max: 1000
            }
            .code(),
            "too_long"
        );
        assert_eq!(
            PatternError::DangerousShape {
                construct: "(.*)+".to_string()
            }
            .code(),
            "dangerous_shape"
        );
    }

    #[test]
    fn test_policy_error_wraps_pattern_error() {
        let err: PolicyError = PatternError::Empty.into();
        assert!(matches!(err, PolicyError::InvalidPattern(PatternError::Empty)));
    }

    #[test]
    fn test_gateway_error_conversions() {
        let err: GatewayError = PolicyError::SystemTierCreation.into();
        assert!(matches!(err, GatewayError::Policy(_)));

        let err: GatewayError = StorageError::Cancelled.into();
        assert!(matches!(err, GatewayError::Storage(_)));
    }

    #[test]
    fn test_override_error_display_names_actions() {
        let err = OverrideError::InvalidAction {
            base: PolicyAction::Block,
            requested: PolicyAction::Warn,
        };
        let msg = err.to_string();
        assert!(msg.contains("warn"));
        assert!(msg.contains("block"));
    }
}
