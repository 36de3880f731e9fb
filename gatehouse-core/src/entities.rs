//! Entity structs for Gatehouse records

use crate::{
    AuditRecordId, ChangeType, ContextId, LicenseTier, OverrideId, PolicyAction, PolicyCategory,
    PolicyId, PolicyKind, PolicyTier, PolicyVersionId, RecordIdType, Severity, Timestamp,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// STATIC POLICY
// ============================================================================

/// A named pattern-matching rule.
///
/// `id` is the stable row id; `policy_id` is the human-readable identifier
/// (`sys_*` for seeded system policies). System-tier policies are immutable:
/// their patterns never change after seeding and their behavior can only be
/// adjusted through overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StaticPolicy {
    /// Stable row id
    pub id: PolicyId,
    /// Human-readable policy identifier, unique among non-deleted rows
    pub policy_id: String,
    /// Display name
    pub name: String,
    /// What the policy detects
    pub description: String,
    /// Category from the fixed catalog
    pub category: PolicyCategory,
    /// Authoring tier
    pub tier: PolicyTier,
    /// Regex pattern text (validated before persistence)
    pub pattern: String,
    /// Enforcement action on match
    pub action: PolicyAction,
    /// Severity classification
    pub severity: Severity,
    /// Evaluation priority (higher evaluates earlier within a tier)
    pub priority: i32,
    /// Whether the policy participates in evaluation
    pub enabled: bool,
    /// Owning organization (organization tier only)
    pub organization_id: Option<String>,
    /// Owning tenant; `"global"` for system-tier rows
    pub tenant_id: String,
    /// Free-form labels
    pub tags: Vec<String>,
    /// Opaque structured metadata
    pub metadata: serde_json::Value,
    /// Monotonic version, bumped on every mutation
    pub version: i32,
    #[cfg_attr(feature = "openapi", schema(value_type = chrono::DateTime<chrono::Utc>))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = chrono::DateTime<chrono::Utc>))]
    pub updated_at: Timestamp,
    pub created_by: String,
    pub updated_by: String,
    /// Soft-delete marker
    #[cfg_attr(feature = "openapi", schema(value_type = Option<chrono::DateTime<chrono::Utc>>))]
    pub deleted_at: Option<Timestamp>,
}

impl StaticPolicy {
    /// Create a new enabled policy at version 1.
    pub fn new(
        policy_id: impl Into<String>,
        name: impl Into<String>,
        category: PolicyCategory,
        tier: PolicyTier,
        pattern: impl Into<String>,
        action: PolicyAction,
        severity: Severity,
        tenant_id: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let created_by = created_by.into();
        Self {
            id: PolicyId::now_v7(),
            policy_id: policy_id.into(),
            name: name.into(),
            description: String::new(),
            category,
            tier,
            pattern: pattern.into(),
            action,
            severity,
            priority: 50,
            enabled: true,
            organization_id: None,
            tenant_id: tenant_id.into(),
            tags: Vec::new(),
            metadata: serde_json::Value::Null,
            version: 1,
            created_at: now,
            updated_at: now,
            updated_by: created_by.clone(),
            created_by,
            deleted_at: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the owning organization.
    pub fn with_organization_id(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    /// Set the tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the metadata blob.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether this row has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether this is an immutable system-tier policy.
    pub fn is_system(&self) -> bool {
        self.tier == PolicyTier::System
    }
}

// ============================================================================
// POLICY OVERRIDE
// ============================================================================

/// Scope an override applies to. Tenant scope shadows organization scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum OverrideScope {
    Tenant(String),
    Organization(String),
}

impl fmt::Display for OverrideScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideScope::Tenant(id) => write!(f, "tenant:{}", id),
            OverrideScope::Organization(id) => write!(f, "org:{}", id),
        }
    }
}

/// A per-org or per-tenant modifier of a system policy.
///
/// Overrides adjust the effective action or enabled flag of an immutable
/// system policy without touching the policy row itself. Action overrides
/// are restrictive-monotonic; weakening a policy is forbidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PolicyOverride {
    pub id: OverrideId,
    /// Human-readable id of the targeted system policy
    pub policy_id: String,
    /// Whether the target is a static or dynamic policy
    pub policy_kind: PolicyKind,
    /// Organization scope (exactly one of organization_id/tenant_id is set)
    pub organization_id: Option<String>,
    /// Tenant scope (exactly one of organization_id/tenant_id is set)
    pub tenant_id: Option<String>,
    /// Replacement action; must be at least as restrictive as the base
    pub action_override: Option<PolicyAction>,
    /// Replacement enabled flag
    pub enabled_override: Option<bool>,
    /// Mandatory human rationale
    pub reason: String,
    /// Optional expiry; an expired override is invisible
    #[cfg_attr(feature = "openapi", schema(value_type = Option<chrono::DateTime<chrono::Utc>>))]
    pub expires_at: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = chrono::DateTime<chrono::Utc>))]
    pub created_at: Timestamp,
    pub created_by: String,
}

impl PolicyOverride {
    /// Create a tenant-scoped override.
    pub fn for_tenant(
        policy_id: impl Into<String>,
        tenant_id: impl Into<String>,
        reason: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: OverrideId::now_v7(),
            policy_id: policy_id.into(),
            policy_kind: PolicyKind::Static,
            organization_id: None,
            tenant_id: Some(tenant_id.into()),
            action_override: None,
            enabled_override: None,
            reason: reason.into(),
            expires_at: None,
            created_at: Utc::now(),
            created_by: created_by.into(),
        }
    }

    /// Create an organization-scoped override.
    pub fn for_organization(
        policy_id: impl Into<String>,
        organization_id: impl Into<String>,
        reason: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: OverrideId::now_v7(),
            policy_id: policy_id.into(),
            policy_kind: PolicyKind::Static,
            organization_id: Some(organization_id.into()),
            tenant_id: None,
            action_override: None,
            enabled_override: None,
            reason: reason.into(),
            expires_at: None,
            created_at: Utc::now(),
            created_by: created_by.into(),
        }
    }

    /// Set the action override.
    pub fn with_action(mut self, action: PolicyAction) -> Self {
        self.action_override = Some(action);
        self
    }

    /// Set the enabled override.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled_override = Some(enabled);
        self
    }

    /// Set the expiry.
    pub fn with_expires_at(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// An override is active iff it has no expiry or the expiry is in the
    /// future.
    pub fn is_active(&self, now: Timestamp) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at > now,
        }
    }

    /// The scope this override applies to. Tenant scope wins when both ids
    /// are present on a malformed row.
    pub fn scope(&self) -> Option<OverrideScope> {
        if let Some(tenant_id) = &self.tenant_id {
            return Some(OverrideScope::Tenant(tenant_id.clone()));
        }
        self.organization_id
            .as_ref()
            .map(|org_id| OverrideScope::Organization(org_id.clone()))
    }
}

// ============================================================================
// POLICY VERSION
// ============================================================================

/// Immutable snapshot of a static policy at a given version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PolicyVersion {
    pub id: PolicyVersionId,
    /// Human-readable id of the snapshotted policy
    pub policy_id: String,
    /// Version number this snapshot captures
    pub version: i32,
    /// Full policy state at that version
    pub snapshot: StaticPolicy,
    /// What kind of mutation produced this snapshot
    pub change_type: ChangeType,
    /// One-line summary of the change
    pub summary: String,
    /// Actor who performed the mutation
    pub changed_by: String,
    #[cfg_attr(feature = "openapi", schema(value_type = chrono::DateTime<chrono::Utc>))]
    pub created_at: Timestamp,
}

impl PolicyVersion {
    /// Snapshot a policy after a mutation.
    pub fn capture(
        policy: &StaticPolicy,
        change_type: ChangeType,
        summary: impl Into<String>,
        changed_by: impl Into<String>,
    ) -> Self {
        Self {
            id: PolicyVersionId::now_v7(),
            policy_id: policy.policy_id.clone(),
            version: policy.version,
            snapshot: policy.clone(),
            change_type,
            summary: summary.into(),
            changed_by: changed_by.into(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// DYNAMIC POLICY
// ============================================================================

/// A catalog-seeded dynamic policy.
///
/// Dynamic policies are classified under `dynamic-*` categories and carry
/// guidance text instead of a regex pattern. They are listable and
/// overridable; their evaluation happens on the LLM side, outside this
/// service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DynamicPolicy {
    /// Human-readable identifier (`sys_dyn_*`)
    pub policy_id: String,
    pub name: String,
    pub description: String,
    pub category: PolicyCategory,
    pub severity: Severity,
    pub action: PolicyAction,
    pub priority: i32,
    pub enabled: bool,
    /// Evaluation guidance passed to the downstream evaluator
    pub guidance: String,
}

// ============================================================================
// CONTEXT TOKEN
// ============================================================================

/// Approval record binding a pre-checked query to a future LLM call.
///
/// A denied pre-check still mints a context (for auditability) but such a
/// context never validates for audit recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ContextToken {
    pub context_id: ContextId,
    /// Client the context is bound to; validation rejects any other caller
    pub client_id: String,
    /// SHA-256 of the user token presented at pre-check
    pub user_token_hash: String,
    /// SHA-256 of the evaluated query text
    pub query_hash: String,
    /// Data sources named in the pre-check request
    pub data_sources: Vec<String>,
    /// Policy ids evaluated, in evaluation order
    pub evaluated_policies: Vec<String>,
    pub approved: bool,
    /// Set whenever `approved` is false
    pub block_reason: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = chrono::DateTime<chrono::Utc>))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = chrono::DateTime<chrono::Utc>))]
    pub expires_at: Timestamp,
}

impl ContextToken {
    /// Whether the context has expired at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

// ============================================================================
// AUDIT RECORD
// ============================================================================

/// Token counters reported for an LLM call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TokenUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

impl TokenUsage {
    /// Build a usage record; `total` defaults to prompt + completion when
    /// callers report zero.
    pub fn new(prompt_tokens: i64, completion_tokens: i64, total_tokens: i64) -> Self {
        let total_tokens = if total_tokens == 0 {
            prompt_tokens + completion_tokens
        } else {
            total_tokens
        };
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }

    /// All counters are non-negative.
    pub fn is_valid(&self) -> bool {
        self.prompt_tokens >= 0 && self.completion_tokens >= 0 && self.total_tokens >= 0
    }
}

/// Post-call outcome keyed by context id. Audit records are permanent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub context_id: ContextId,
    pub client_id: String,
    pub provider: String,
    pub model: String,
    pub usage: TokenUsage,
    pub latency_ms: i64,
    /// Estimated cost in USD from the provider price table
    pub estimated_cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
    #[cfg_attr(feature = "openapi", schema(value_type = chrono::DateTime<chrono::Utc>))]
    pub created_at: Timestamp,
}

// ============================================================================
// CLIENT RECORD
// ============================================================================

/// License-lookup contract row for a registered client.
///
/// Populated by the licensing collaborator; the core only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClientRecord {
    pub client_id: String,
    pub tenant_id: String,
    pub organization_id: Option<String>,
    pub license: LicenseTier,
    /// Per-minute request budget; falls back to the service default when None
    pub rate_limit_per_minute: Option<u32>,
}

impl ClientRecord {
    /// A minimal community client record for a bare client id.
    pub fn community(client_id: impl Into<String>) -> Self {
        let client_id = client_id.into();
        Self {
            tenant_id: client_id.clone(),
            client_id,
            organization_id: None,
            license: LicenseTier::Community,
            rate_limit_per_minute: None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
