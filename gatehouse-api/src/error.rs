//! Error Types for the Gatehouse API
//!
//! Defines error handling for the API layer: an `ErrorCode` enum
//! categorizing failures, an `ApiError` carrying the code and message, and
//! the `IntoResponse` implementation producing the wire envelope
//! `{"error": {"code": <http_status>, "message": <string>}}`.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gatehouse_core::{
    AuditError, ContextError, GatewayError, OverrideError, PolicyError, StorageError,
};
use serde::Serialize;
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error categories surfaced by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Missing or invalid input
    BadRequest,
    /// Missing tenant headers or unknown tenant
    Unauthorized,
    /// Authenticated but not allowed
    Forbidden,
    /// Attempt to mutate a system-tier policy
    ForbiddenTier,
    /// Feature requires an Enterprise license
    LicenseRequired,
    /// Tenant policy quota exhausted
    QuotaExceeded,
    /// Per-customer rate limit denial
    RateLimited,
    /// Pattern failed validation
    InvalidPattern,
    /// Missing policy/override/context
    NotFound,
    /// Duplicate override or concurrent modification
    Conflict,
    /// Storage failure
    StorageError,
    /// Shared cache failure
    CacheError,
    /// Anything else
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest | ErrorCode::InvalidPattern => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden
            | ErrorCode::ForbiddenTier
            | ErrorCode::LicenseRequired
            | ErrorCode::QuotaExceeded => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::StorageError | ErrorCode::CacheError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR
// ============================================================================

/// Structured error returned by API handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    /// Seconds the caller should wait before retrying (rate limits)
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    /// Create a BadRequest error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create an Unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a NotFound error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a RateLimited error with a retry hint.
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self {
            code: ErrorCode::RateLimited,
            message: format!(
                "Rate limit exceeded. Retry after {} seconds",
                retry_after_secs
            ),
            retry_after_secs: Some(retry_after_secs),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// WIRE ENVELOPE
// ============================================================================

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let envelope = ErrorEnvelope {
            error: ErrorBody {
                code: status.as_u16(),
                message: self.message,
            },
        };
        let mut response = (status, Json(envelope)).into_response();
        if let Some(retry_after) = self.retry_after_secs {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("retry-after", value);
            }
        }
        response
    }
}

// ============================================================================
// CONVERSIONS FROM GATEWAY ERRORS
// ============================================================================

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::BadRequest { message } => ApiError::bad_request(message),
            GatewayError::RateLimited { retry_after_secs } => {
                ApiError::rate_limited(retry_after_secs)
            }
            GatewayError::Pattern(e) => ApiError::new(ErrorCode::InvalidPattern, e.to_string()),
            GatewayError::Policy(e) => e.into(),
            GatewayError::Override(e) => e.into(),
            GatewayError::Context(e) => e.into(),
            GatewayError::Audit(e) => e.into(),
            GatewayError::Cache(e) => {
                tracing::error!(error = %e, "Cache error");
                ApiError::new(ErrorCode::CacheError, "Shared cache operation failed")
            }
            GatewayError::Storage(e) => e.into(),
        }
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        let code = match &err {
            PolicyError::SystemTierCreation
            | PolicyError::SystemPolicyModification { .. }
            | PolicyError::SystemPolicyDeletion { .. } => ErrorCode::ForbiddenTier,
            PolicyError::OrgTierRequiresEnterprise => ErrorCode::LicenseRequired,
            PolicyError::TenantPolicyLimitReached { .. } => ErrorCode::QuotaExceeded,
            PolicyError::InvalidPattern(_) => ErrorCode::InvalidPattern,
            PolicyError::InvalidCategory { .. } | PolicyError::InvalidTier { .. } => {
                ErrorCode::BadRequest
            }
            PolicyError::NotFound { .. } => ErrorCode::NotFound,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<OverrideError> for ApiError {
    fn from(err: OverrideError) -> Self {
        let code = match &err {
            OverrideError::ReasonRequired
            | OverrideError::InvalidAction { .. }
            | OverrideError::OnlySystemPolicies { .. } => ErrorCode::BadRequest,
            OverrideError::RequiresEnterprise => ErrorCode::LicenseRequired,
            OverrideError::AlreadyExists { .. } => ErrorCode::Conflict,
            OverrideError::NotFound { .. } | OverrideError::PolicyNotFound { .. } => {
                ErrorCode::NotFound
            }
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ContextError> for ApiError {
    fn from(err: ContextError) -> Self {
        let code = match &err {
            ContextError::NotFound { .. } => ErrorCode::NotFound,
            ContextError::Expired { .. }
            | ContextError::ClientMismatch { .. }
            | ContextError::NotApproved { .. } => ErrorCode::Forbidden,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::Context(inner) => inner.into(),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::NotFound { .. } => ApiError::not_found(err.to_string()),
            StorageError::Conflict { .. } => ApiError::new(ErrorCode::Conflict, err.to_string()),
            _ => {
                tracing::error!(error = %err, "Storage error");
                ApiError::new(ErrorCode::StorageError, "Storage operation failed")
            }
        }
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::PatternError;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::ForbiddenTier.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::LicenseRequired.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::QuotaExceeded.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_gateway_error_mapping() {
        let err: ApiError = GatewayError::bad_request("missing query").into();
        assert_eq!(err.code, ErrorCode::BadRequest);

        let err: ApiError = GatewayError::RateLimited {
            retry_after_secs: 30,
        }
        .into();
        assert_eq!(err.code, ErrorCode::RateLimited);
        assert_eq!(err.retry_after_secs, Some(30));

        let err: ApiError = GatewayError::Policy(PolicyError::SystemTierCreation).into();
        assert_eq!(err.code, ErrorCode::ForbiddenTier);

        let err: ApiError =
            GatewayError::Policy(PolicyError::InvalidPattern(PatternError::Empty)).into();
        assert_eq!(err.code, ErrorCode::InvalidPattern);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = GatewayError::Policy(PolicyError::OrgTierRequiresEnterprise).into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = ErrorEnvelope {
            error: ErrorBody {
                code: 429,
                message: "Rate limit exceeded".to_string(),
            },
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["error"]["code"], 429);
        assert_eq!(json["error"]["message"], "Rate limit exceeded");
    }
}
