//! Effective-policy resolver.
//!
//! Joins the policy store and the override store into the ordered rule list
//! an evaluator sees for one `(tenant, organization)` scope. One pass, no
//! recursion: read the policies in scope, read the matching overrides,
//! layer them in memory.

use chrono::Utc;
use gatehouse_core::{
    GatewayResult, PolicyAction, PolicyOverride, RecordIdType, StaticPolicy,
};
use gatehouse_storage::Storage;
use std::collections::HashMap;
use std::sync::Arc;

/// A policy after its override (if any, and if active) is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivePolicy {
    /// The base policy snapshot
    pub policy: StaticPolicy,
    /// Effective enforcement action
    pub action: PolicyAction,
    /// Effective enabled flag
    pub enabled: bool,
    /// Whether an override contributed to the effective state
    pub overridden: bool,
}

impl EffectivePolicy {
    fn base(policy: StaticPolicy) -> Self {
        Self {
            action: policy.action,
            enabled: policy.enabled,
            overridden: false,
            policy,
        }
    }

    fn apply(&mut self, record: &PolicyOverride) {
        if let Some(action) = record.action_override {
            self.action = action;
        }
        if let Some(enabled) = record.enabled_override {
            self.enabled = enabled;
        }
        self.overridden = true;
    }
}

/// Resolver over the storage contract.
#[derive(Clone)]
pub struct EffectivePolicyResolver {
    storage: Arc<dyn Storage>,
}

impl EffectivePolicyResolver {
    /// Create a resolver for the given storage backend.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Resolve the ordered effective policy list for a scope.
    ///
    /// Selection: enabled, non-deleted policies that are system-tier, the
    /// organization's, or the tenant's. Active overrides then set the
    /// effective action/enabled flags, tenant scope shadowing organization
    /// scope. Ordering is deterministic: tier (system < organization <
    /// tenant), then priority desc, then name asc, then stable id.
    pub async fn resolve(
        &self,
        tenant_id: &str,
        organization_id: Option<&str>,
    ) -> GatewayResult<Vec<EffectivePolicy>> {
        let now = Utc::now();
        let policies = self
            .storage
            .policy_list_for_scope(tenant_id, organization_id)
            .await?;
        let overrides = self
            .storage
            .override_list_for_scope(tenant_id, organization_id)
            .await?;

        // Partition active overrides by scope; tenant shadows org.
        let mut org_overrides: HashMap<&str, &PolicyOverride> = HashMap::new();
        let mut tenant_overrides: HashMap<&str, &PolicyOverride> = HashMap::new();
        for record in overrides.iter().filter(|o| o.is_active(now)) {
            if record.tenant_id.as_deref() == Some(tenant_id) {
                tenant_overrides.insert(record.policy_id.as_str(), record);
            } else if record.organization_id.is_some() {
                org_overrides.insert(record.policy_id.as_str(), record);
            }
        }

        let mut effective: Vec<EffectivePolicy> = policies
            .into_iter()
            .filter(|p| p.enabled)
            .map(|p| {
                let mut e = EffectivePolicy::base(p);
                let record = tenant_overrides
                    .get(e.policy.policy_id.as_str())
                    .or_else(|| org_overrides.get(e.policy.policy_id.as_str()));
                if let Some(record) = record {
                    e.apply(record);
                }
                e
            })
            .collect();

        effective.sort_by(|a, b| {
            a.policy
                .tier
                .rank()
                .cmp(&b.policy.tier.rank())
                .then_with(|| b.policy.priority.cmp(&a.policy.priority))
                .then_with(|| a.policy.name.cmp(&b.policy.name))
                .then_with(|| a.policy.id.as_uuid().cmp(&b.policy.id.as_uuid()))
        });

        Ok(effective)
    }
}

// ============================================================================
// TESTS
// ============================================================================
