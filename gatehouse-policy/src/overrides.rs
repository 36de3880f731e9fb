//! Override engine.
//!
//! Overrides adjust the effective action or enabled flag of an immutable
//! system policy for one scope (a tenant or an organization) without
//! touching the policy row. Action overrides are restrictive-monotonic:
//! tightening is allowed, weakening is not. Expired overrides are invisible
//! and swept passively.

use chrono::Utc;
use gatehouse_core::{
    builtin_dynamic_policies, GatewayError, GatewayResult, LicenseTier, OverrideId,
    OverrideScope, PolicyAction, PolicyKind, PolicyOverride, PolicyTier, Timestamp,
    OverrideError,
};
use gatehouse_storage::Storage;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// REQUEST TYPES
// ============================================================================

/// Input for creating an override.
#[derive(Debug, Clone)]
pub struct CreateOverrideInput {
    /// Human-readable id of the targeted system policy
    pub policy_id: String,
    pub policy_kind: PolicyKind,
    pub organization_id: Option<String>,
    pub tenant_id: Option<String>,
    pub action_override: Option<PolicyAction>,
    pub enabled_override: Option<bool>,
    pub reason: String,
    pub expires_at: Option<Timestamp>,
}

// ============================================================================
// OVERRIDE ENGINE
// ============================================================================

/// Override CRUD and effective-action resolution.
#[derive(Clone)]
pub struct OverrideEngine {
    storage: Arc<dyn Storage>,
    license: LicenseTier,
}

impl OverrideEngine {
    /// Create an engine for the given storage backend and license tier.
    pub fn new(storage: Arc<dyn Storage>, license: LicenseTier) -> Self {
        Self { storage, license }
    }

    /// Create an override against a system policy.
    pub async fn create(
        &self,
        input: CreateOverrideInput,
        created_by: &str,
    ) -> GatewayResult<PolicyOverride> {
        if input.reason.trim().is_empty() {
            return Err(OverrideError::ReasonRequired.into());
        }
        if !self.license.is_enterprise() {
            return Err(OverrideError::RequiresEnterprise.into());
        }

        let scope = match (&input.tenant_id, &input.organization_id) {
            (Some(tenant), None) if !tenant.is_empty() => OverrideScope::Tenant(tenant.clone()),
            (None, Some(org)) if !org.is_empty() => OverrideScope::Organization(org.clone()),
            _ => {
                return Err(GatewayError::bad_request(
                    "exactly one of tenant_id or organization_id must be set",
                ));
            }
        };

        let base_action = self
            .base_action(&input.policy_id, input.policy_kind)
            .await?;
        if let Some(requested) = input.action_override {
            if !requested.is_at_least_as_restrictive(base_action) {
                return Err(OverrideError::InvalidAction {
                    base: base_action,
                    requested,
                }
                .into());
            }
        }

        let now = Utc::now();
        let existing = self
            .storage
            .override_list_for_policy(&input.policy_id)
            .await?;
        let duplicate = existing
            .iter()
            .any(|o| o.is_active(now) && o.scope().as_ref() == Some(&scope));
        if duplicate {
            return Err(OverrideError::AlreadyExists {
                policy_id: input.policy_id,
                scope,
            }
            .into());
        }

        let mut record = match &scope {
            OverrideScope::Tenant(tenant) => PolicyOverride::for_tenant(
                input.policy_id,
                tenant.clone(),
                input.reason,
                created_by,
            ),
            OverrideScope::Organization(org) => PolicyOverride::for_organization(
                input.policy_id,
                org.clone(),
                input.reason,
                created_by,
            ),
        };
        record.policy_kind = input.policy_kind;
        record.action_override = input.action_override;
        record.enabled_override = input.enabled_override;
        record.expires_at = input.expires_at;

        self.storage.override_insert(&record).await?;
        tracing::info!(
            policy_id = %record.policy_id,
            scope = %scope,
            "Override created"
        );
        Ok(record)
    }

    /// Delete an override by id.
    pub async fn delete(&self, id: &str, actor: &str) -> GatewayResult<()> {
        let id = OverrideId::from_str(id).map_err(|_| OverrideError::NotFound {
            id: id.to_string(),
        })?;
        if !self.storage.override_delete(id).await? {
            return Err(OverrideError::NotFound { id: id.to_string() }.into());
        }
        tracing::info!(override_id = %id, actor, "Override deleted");
        Ok(())
    }

    /// Delete the active override for a `(policy_id, scope)` pair.
    pub async fn delete_scoped(
        &self,
        policy_id: &str,
        scope: &OverrideScope,
        actor: &str,
    ) -> GatewayResult<()> {
        let now = Utc::now();
        let existing = self.storage.override_list_for_policy(policy_id).await?;
        let target = existing
            .iter()
            .find(|o| o.is_active(now) && o.scope().as_ref() == Some(scope))
            .ok_or_else(|| OverrideError::NotFound {
                id: format!("{}@{}", policy_id, scope),
            })?;
        self.storage.override_delete(target.id).await?;
        tracing::info!(policy_id, scope = %scope, actor, "Scoped override deleted");
        Ok(())
    }

    /// Effective action for a policy in a scope.
    ///
    /// Tenant-scoped overrides shadow organization-scoped ones; absent any
    /// active override the result is `(None, false)`.
    pub async fn get_effective_action(
        &self,
        policy_id: &str,
        tenant_id: &str,
        organization_id: Option<&str>,
    ) -> GatewayResult<(Option<PolicyAction>, bool)> {
        let now = Utc::now();
        let overrides = self.storage.override_list_for_policy(policy_id).await?;

        let tenant_hit = overrides
            .iter()
            .find(|o| o.is_active(now) && o.tenant_id.as_deref() == Some(tenant_id));
        if let Some(o) = tenant_hit {
            return Ok((o.action_override, true));
        }

        if let Some(org) = organization_id {
            let org_hit = overrides
                .iter()
                .find(|o| o.is_active(now) && o.organization_id.as_deref() == Some(org));
            if let Some(o) = org_hit {
                return Ok((o.action_override, true));
            }
        }

        Ok((None, false))
    }

    /// Passive sweep of expired overrides. Best-effort: callers may ignore
    /// the error. Returns the number of rows removed.
    pub async fn cleanup_expired(&self) -> GatewayResult<u64> {
        let removed = self.storage.override_delete_expired(Utc::now()).await?;
        if removed > 0 {
            tracing::debug!(removed, "Swept expired overrides");
        }
        Ok(removed)
    }

    /// Resolve the base action of the override target, verifying the target
    /// exists and is system-tier.
    async fn base_action(
        &self,
        policy_id: &str,
        kind: PolicyKind,
    ) -> GatewayResult<PolicyAction> {
        match kind {
            PolicyKind::Static => {
                let policy = self
                    .storage
                    .policy_get_by_policy_id(policy_id)
                    .await?
                    .ok_or_else(|| OverrideError::PolicyNotFound {
                        policy_id: policy_id.to_string(),
                    })?;
                if policy.tier != PolicyTier::System {
                    return Err(OverrideError::OnlySystemPolicies {
                        policy_id: policy_id.to_string(),
                    }
                    .into());
                }
                Ok(policy.action)
            }
            PolicyKind::Dynamic => builtin_dynamic_policies()
                .iter()
                .find(|p| p.policy_id == policy_id)
                .map(|p| p.action)
                .ok_or_else(|| {
                    OverrideError::PolicyNotFound {
                        policy_id: policy_id.to_string(),
                    }
                    .into()
                }),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
