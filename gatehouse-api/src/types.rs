//! Request and response types for the REST API.
//!
//! One canonical policy envelope (`PolicyResponse`) is used by every route
//! that returns a policy. Enum-valued fields arrive as strings and are
//! parsed in the handlers so invalid values produce 400s with the right
//! error messages instead of body-rejection noise.

use chrono::{DateTime, Utc};
use gatehouse_core::{AuditRecord, PolicyOverride, PolicyVersion, StaticPolicy, TokenUsage};
use gatehouse_policy::{EffectivePolicy, MatchOutcome};
use serde::{Deserialize, Serialize};

// ============================================================================
// PRE-CHECK / AUDIT
// ============================================================================

/// Request body for `POST /api/policy/pre-check`.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PreCheckRequestBody {
    #[serde(default)]
    pub user_token: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub data_sources: Vec<String>,
}

/// Response body for `POST /api/policy/pre-check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PreCheckResponseBody {
    pub context_id: String,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Token counters as reported by the caller.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TokenUsageBody {
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
}

impl From<TokenUsageBody> for TokenUsage {
    fn from(body: TokenUsageBody) -> Self {
        TokenUsage::new(body.prompt_tokens, body.completion_tokens, body.total_tokens)
    }
}

/// Request body for `POST /api/audit/llm-call`.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuditRequestBody {
    #[serde(default)]
    pub context_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub response_summary: Option<String>,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub token_usage: TokenUsageBody,
    #[serde(default)]
    pub latency_ms: i64,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
}

/// Response body for `POST /api/audit/llm-call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuditResponseBody {
    pub success: bool,
    pub audit_id: String,
}

impl From<&AuditRecord> for AuditResponseBody {
    fn from(record: &AuditRecord) -> Self {
        Self {
            success: true,
            audit_id: record.id.to_string(),
        }
    }
}

// ============================================================================
// POLICY CRUD
// ============================================================================

/// Request body for creating a policy.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreatePolicyRequest {
    #[serde(default)]
    pub policy_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub tier: String,
    pub pattern: String,
    pub action: String,
    pub severity: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub metadata: serde_json::Value,
}

fn default_true() -> bool {
    true
}

/// Request body for updating a policy. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdatePolicyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub pattern: Option<String>,
    pub action: Option<String>,
    pub severity: Option<String>,
    pub priority: Option<i32>,
    pub tags: Option<Vec<String>>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
}

/// Request body for `PATCH /api/v1/static-policies/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TogglePolicyRequest {
    pub enabled: bool,
}

/// The canonical policy envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PolicyResponse {
    pub id: String,
    pub policy_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tier: String,
    pub pattern: String,
    pub action: String,
    pub severity: String,
    pub priority: i32,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub tenant_id: String,
    pub tags: Vec<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub metadata: serde_json::Value,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl From<&StaticPolicy> for PolicyResponse {
    fn from(policy: &StaticPolicy) -> Self {
        Self {
            id: policy.id.to_string(),
            policy_id: policy.policy_id.clone(),
            name: policy.name.clone(),
            description: policy.description.clone(),
            category: policy.category.to_string(),
            tier: policy.tier.to_string(),
            pattern: policy.pattern.clone(),
            action: policy.action.to_string(),
            severity: policy.severity.to_string(),
            priority: policy.priority,
            enabled: policy.enabled,
            organization_id: policy.organization_id.clone(),
            tenant_id: policy.tenant_id.clone(),
            tags: policy.tags.clone(),
            metadata: policy.metadata.clone(),
            version: policy.version,
            created_at: policy.created_at,
            updated_at: policy.updated_at,
            created_by: policy.created_by.clone(),
            updated_by: policy.updated_by.clone(),
        }
    }
}

/// Response body for policy listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListPoliciesResponse {
    pub policies: Vec<PolicyResponse>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
}

/// Query parameters for policy listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct ListPoliciesQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    pub category: Option<String>,
    pub tier: Option<String>,
    pub enabled: Option<bool>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
}

/// One effective policy: the base envelope plus the post-override state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EffectivePolicyResponse {
    #[serde(flatten)]
    pub policy: PolicyResponse,
    /// Action after override layering
    pub effective_action: String,
    /// Enabled flag after override layering
    pub effective_enabled: bool,
    pub overridden: bool,
}

impl From<&EffectivePolicy> for EffectivePolicyResponse {
    fn from(effective: &EffectivePolicy) -> Self {
        Self {
            policy: PolicyResponse::from(&effective.policy),
            effective_action: effective.action.to_string(),
            effective_enabled: effective.enabled,
            overridden: effective.overridden,
        }
    }
}

/// Response body for the effective-policy listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EffectivePoliciesResponse {
    pub policies: Vec<EffectivePolicyResponse>,
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

// ============================================================================
// PATTERN TESTING
// ============================================================================

/// Request body for `POST /api/v1/static-policies/test`.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TestPatternRequest {
    pub pattern: String,
    /// Single input shorthand
    pub input: Option<String>,
    /// Batch of inputs
    #[serde(default)]
    pub inputs: Vec<String>,
}

impl TestPatternRequest {
    /// Collect the effective input list, single-input shorthand included.
    pub fn all_inputs(&self) -> Vec<String> {
        let mut inputs = self.inputs.clone();
        if let Some(input) = &self.input {
            inputs.insert(0, input.clone());
        }
        inputs
    }
}

/// Per-input result of a pattern test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MatchResultBody {
    pub input: String,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
    pub groups: Vec<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MatchResultBody {
    /// Pair an outcome with the input it was computed for.
    pub fn from_outcome(input: &str, outcome: &MatchOutcome) -> Self {
        Self {
            input: input.to_string(),
            matched: outcome.matched,
            matched_text: outcome.matched_text.clone(),
            groups: outcome.groups.clone(),
            start: outcome.start,
            end: outcome.end,
            error: outcome.error.clone(),
        }
    }
}

/// Response body for pattern tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TestPatternResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub results: Vec<MatchResultBody>,
    pub cancelled: bool,
}

// ============================================================================
// OVERRIDES
// ============================================================================

/// Request body for creating an override.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateOverrideRequest {
    #[serde(default)]
    pub policy_kind: Option<String>,
    /// Override scope; defaults to the calling tenant when neither id is set
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub action_override: Option<String>,
    #[serde(default)]
    pub enabled_override: Option<bool>,
    pub reason: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Response body for override records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OverrideResponse {
    pub id: String,
    pub policy_id: String,
    pub policy_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_override: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_override: Option<bool>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl From<&PolicyOverride> for OverrideResponse {
    fn from(record: &PolicyOverride) -> Self {
        Self {
            id: record.id.to_string(),
            policy_id: record.policy_id.clone(),
            policy_kind: record.policy_kind.to_string(),
            organization_id: record.organization_id.clone(),
            tenant_id: record.tenant_id.clone(),
            action_override: record.action_override.map(|a| a.to_string()),
            enabled_override: record.enabled_override,
            reason: record.reason.clone(),
            expires_at: record.expires_at,
            created_at: record.created_at,
            created_by: record.created_by.clone(),
        }
    }
}

// ============================================================================
// VERSIONS
// ============================================================================

/// One version snapshot in a policy's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PolicyVersionResponse {
    pub version: i32,
    pub change_type: String,
    pub summary: String,
    pub changed_by: String,
    pub created_at: DateTime<Utc>,
    pub snapshot: PolicyResponse,
}

impl From<&PolicyVersion> for PolicyVersionResponse {
    fn from(record: &PolicyVersion) -> Self {
        Self {
            version: record.version,
            change_type: record.change_type.to_string(),
            summary: record.summary.clone(),
            changed_by: record.changed_by.clone(),
            created_at: record.created_at,
            snapshot: PolicyResponse::from(&record.snapshot),
        }
    }
}

/// Response body for version history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PolicyVersionsResponse {
    pub policy_id: String,
    pub versions: Vec<PolicyVersionResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_pattern_request_merges_inputs() {
        let request = TestPatternRequest {
            pattern: "a".to_string(),
            input: Some("single".to_string()),
            inputs: vec!["batch".to_string()],
        };
        assert_eq!(request.all_inputs(), vec!["single", "batch"]);

        let batch_only = TestPatternRequest {
            pattern: "a".to_string(),
            input: None,
            inputs: vec!["x".to_string()],
        };
        assert_eq!(batch_only.all_inputs(), vec!["x"]);
    }

    #[test]
    fn test_precheck_response_omits_absent_reason() {
        let body = PreCheckResponseBody {
            context_id: "ctx_1".to_string(),
            approved: true,
            block_reason: None,
            expires_at: Utc::now(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("block_reason").is_none());
        assert_eq!(json["approved"], true);
    }
}
