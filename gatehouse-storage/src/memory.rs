//! In-memory storage implementation.

use crate::{Storage, StorageResult};
use async_trait::async_trait;
use gatehouse_core::{
    AuditRecord, AuditRecordId, ClientRecord, ContextId, ContextToken, OverrideId, PolicyId,
    PolicyOverride, PolicyTier, PolicyVersion, StaticPolicy, StorageError, Timestamp,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory storage backing tests and single-process deployments.
///
/// Every table is a map under its own `RwLock`; clones share the underlying
/// state (teacher for the SQL collaborator, not a replacement for it).
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    policies: Arc<RwLock<HashMap<PolicyId, StaticPolicy>>>,
    overrides: Arc<RwLock<HashMap<OverrideId, PolicyOverride>>>,
    versions: Arc<RwLock<Vec<PolicyVersion>>>,
    contexts: Arc<RwLock<HashMap<String, ContextToken>>>,
    audits: Arc<RwLock<HashMap<AuditRecordId, AuditRecord>>>,
    clients: Arc<RwLock<HashMap<String, ClientRecord>>>,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StorageError> {
    lock.read().map_err(|_| StorageError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StorageError> {
    lock.write().map_err(|_| StorageError::LockPoisoned)
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        if let Ok(mut g) = self.policies.write() {
            g.clear();
        }
        if let Ok(mut g) = self.overrides.write() {
            g.clear();
        }
        if let Ok(mut g) = self.versions.write() {
            g.clear();
        }
        if let Ok(mut g) = self.contexts.write() {
            g.clear();
        }
        if let Ok(mut g) = self.audits.write() {
            g.clear();
        }
        if let Ok(mut g) = self.clients.write() {
            g.clear();
        }
    }

    /// Number of policy rows, including soft-deleted ones.
    pub fn policy_count(&self) -> usize {
        self.policies.read().map(|g| g.len()).unwrap_or(0)
    }

    /// Number of stored version snapshots.
    pub fn version_count(&self) -> usize {
        self.versions.read().map(|g| g.len()).unwrap_or(0)
    }

    /// Number of stored audit records.
    pub fn audit_count(&self) -> usize {
        self.audits.read().map(|g| g.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    // === Health ===

    async fn ping(&self) -> StorageResult<()> {
        // The only failure mode an in-memory store has is a poisoned lock.
        read(&self.policies).map(|_| ())
    }

    // === Static policy operations ===

    async fn policy_insert(&self, policy: &StaticPolicy) -> StorageResult<()> {
        let mut policies = write(&self.policies)?;
        if policies.contains_key(&policy.id) {
            return Err(StorageError::Conflict {
                reason: format!("policy {} already exists", policy.id),
            });
        }
        let duplicate_policy_id = policies
            .values()
            .any(|p| p.policy_id == policy.policy_id && !p.is_deleted());
        if duplicate_policy_id {
            return Err(StorageError::Conflict {
                reason: format!("policy_id {} already in use", policy.policy_id),
            });
        }
        policies.insert(policy.id, policy.clone());
        Ok(())
    }

    async fn policy_get(&self, id: PolicyId) -> StorageResult<Option<StaticPolicy>> {
        Ok(read(&self.policies)?.get(&id).cloned())
    }

    async fn policy_get_by_policy_id(
        &self,
        policy_id: &str,
    ) -> StorageResult<Option<StaticPolicy>> {
        Ok(read(&self.policies)?
            .values()
            .find(|p| p.policy_id == policy_id && !p.is_deleted())
            .cloned())
    }

    async fn policy_update(
        &self,
        policy: &StaticPolicy,
        expected_version: i32,
    ) -> StorageResult<()> {
        let mut policies = write(&self.policies)?;
        let current = policies.get(&policy.id).ok_or(StorageError::NotFound {
            entity: "static_policy",
            id: policy.id.to_string(),
        })?;
        if current.version != expected_version {
            return Err(StorageError::Conflict {
                reason: format!(
                    "policy {} is at version {}, expected {}",
                    policy.id, current.version, expected_version
                ),
            });
        }
        policies.insert(policy.id, policy.clone());
        Ok(())
    }

    async fn policy_list_visible(&self, tenant_id: &str) -> StorageResult<Vec<StaticPolicy>> {
        Ok(read(&self.policies)?
            .values()
            .filter(|p| !p.is_deleted())
            .filter(|p| p.tier == PolicyTier::System || p.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn policy_list_for_scope(
        &self,
        tenant_id: &str,
        organization_id: Option<&str>,
    ) -> StorageResult<Vec<StaticPolicy>> {
        Ok(read(&self.policies)?
            .values()
            .filter(|p| !p.is_deleted())
            .filter(|p| match p.tier {
                PolicyTier::System => true,
                PolicyTier::Organization => {
                    matches!((organization_id, &p.organization_id), (Some(org), Some(own)) if own == org)
                }
                PolicyTier::Tenant => p.tenant_id == tenant_id,
            })
            .cloned()
            .collect())
    }

    async fn policy_count_live_tenant(&self, tenant_id: &str) -> StorageResult<usize> {
        Ok(read(&self.policies)?
            .values()
            .filter(|p| {
                p.tier == PolicyTier::Tenant && p.tenant_id == tenant_id && !p.is_deleted()
            })
            .count())
    }

    // === Override operations ===

    async fn override_insert(&self, record: &PolicyOverride) -> StorageResult<()> {
        let mut overrides = write(&self.overrides)?;
        if overrides.contains_key(&record.id) {
            return Err(StorageError::Conflict {
                reason: format!("override {} already exists", record.id),
            });
        }
        overrides.insert(record.id, record.clone());
        Ok(())
    }

    async fn override_get(&self, id: OverrideId) -> StorageResult<Option<PolicyOverride>> {
        Ok(read(&self.overrides)?.get(&id).cloned())
    }

    async fn override_delete(&self, id: OverrideId) -> StorageResult<bool> {
        Ok(write(&self.overrides)?.remove(&id).is_some())
    }

    async fn override_list_for_policy(
        &self,
        policy_id: &str,
    ) -> StorageResult<Vec<PolicyOverride>> {
        Ok(read(&self.overrides)?
            .values()
            .filter(|o| o.policy_id == policy_id)
            .cloned()
            .collect())
    }

    async fn override_list_for_scope(
        &self,
        tenant_id: &str,
        organization_id: Option<&str>,
    ) -> StorageResult<Vec<PolicyOverride>> {
        Ok(read(&self.overrides)?
            .values()
            .filter(|o| {
                let tenant_match = o.tenant_id.as_deref() == Some(tenant_id);
                let org_match = matches!(
                    (organization_id, o.organization_id.as_deref()),
                    (Some(org), Some(own)) if own == org
                );
                tenant_match || org_match
            })
            .cloned()
            .collect())
    }

    async fn override_delete_expired(&self, now: Timestamp) -> StorageResult<u64> {
        let mut overrides = write(&self.overrides)?;
        let before = overrides.len();
        overrides.retain(|_, o| o.is_active(now));
        Ok((before - overrides.len()) as u64)
    }

    // === Version snapshot operations ===

    async fn version_insert(&self, version: &PolicyVersion) -> StorageResult<()> {
        write(&self.versions)?.push(version.clone());
        Ok(())
    }

    async fn version_list(
        &self,
        policy_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<PolicyVersion>> {
        let versions = read(&self.versions)?;
        let mut matching: Vec<PolicyVersion> = versions
            .iter()
            .filter(|v| v.policy_id == policy_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.version.cmp(&a.version));
        matching.truncate(limit);
        Ok(matching)
    }

    // === Context token operations ===

    async fn context_insert(&self, token: &ContextToken) -> StorageResult<()> {
        let mut contexts = write(&self.contexts)?;
        if contexts.contains_key(token.context_id.as_str()) {
            return Err(StorageError::Conflict {
                reason: format!("context {} already exists", token.context_id),
            });
        }
        contexts.insert(token.context_id.as_str().to_string(), token.clone());
        Ok(())
    }

    async fn context_get(&self, context_id: &ContextId) -> StorageResult<Option<ContextToken>> {
        Ok(read(&self.contexts)?.get(context_id.as_str()).cloned())
    }

    // === Audit record operations ===

    async fn audit_insert(&self, record: &AuditRecord) -> StorageResult<()> {
        let mut audits = write(&self.audits)?;
        if audits.contains_key(&record.id) {
            return Err(StorageError::Conflict {
                reason: format!("audit record {} already exists", record.id),
            });
        }
        audits.insert(record.id, record.clone());
        Ok(())
    }

    async fn audit_get(&self, id: AuditRecordId) -> StorageResult<Option<AuditRecord>> {
        Ok(read(&self.audits)?.get(&id).cloned())
    }

    // === Client operations ===

    async fn client_get(&self, client_id: &str) -> StorageResult<Option<ClientRecord>> {
        Ok(read(&self.clients)?.get(client_id).cloned())
    }

    async fn client_upsert(&self, client: &ClientRecord) -> StorageResult<()> {
        write(&self.clients)?.insert(client.client_id.clone(), client.clone());
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use gatehouse_core::{
        builtin_static_policies, ChangeType, PolicyAction, PolicyCategory, Severity,
    };

    fn tenant_policy(policy_id: &str, tenant_id: &str) -> StaticPolicy {
        StaticPolicy::new(
            policy_id,
            format!("Policy {}", policy_id),
            PolicyCategory::PiiGlobal,
            PolicyTier::Tenant,
            r"\bx\b",
            PolicyAction::Warn,
            Severity::Low,
            tenant_id,
            "tester",
        )
    }

    #[tokio::test]
    async fn test_ping() {
        let storage = MemoryStorage::new();
        storage.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_policy_insert_and_get() {
        let storage = MemoryStorage::new();
        let p = tenant_policy("pol_a", "t1");
        storage.policy_insert(&p).await.unwrap();

        let by_id = storage.policy_get(p.id).await.unwrap().unwrap();
        assert_eq!(by_id, p);

        let by_policy_id = storage
            .policy_get_by_policy_id("pol_a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_policy_id.id, p.id);
    }

    #[tokio::test]
    async fn test_policy_id_uniqueness_among_live_rows() {
        let storage = MemoryStorage::new();
        let p = tenant_policy("pol_a", "t1");
        storage.policy_insert(&p).await.unwrap();

        let dup = tenant_policy("pol_a", "t2");
        assert!(matches!(
            storage.policy_insert(&dup).await,
            Err(StorageError::Conflict { .. })
        ));

        // Soft-deleting the first row frees the policy_id.
        let mut deleted = p.clone();
        deleted.deleted_at = Some(Utc::now());
        deleted.version += 1;
        storage.policy_update(&deleted, p.version).await.unwrap();
        storage.policy_insert(&dup).await.unwrap();
    }

    #[tokio::test]
    async fn test_policy_update_optimistic_concurrency() {
        let storage = MemoryStorage::new();
        let p = tenant_policy("pol_a", "t1");
        storage.policy_insert(&p).await.unwrap();

        let mut updated = p.clone();
        updated.version = 2;
        updated.name = "renamed".to_string();
        storage.policy_update(&updated, 1).await.unwrap();

        // A second writer holding the stale version loses.
        let mut stale = p.clone();
        stale.version = 2;
        assert!(matches!(
            storage.policy_update(&stale, 1).await,
            Err(StorageError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_visibility_is_system_plus_own_tenant() {
        let storage = MemoryStorage::new();
        for p in builtin_static_policies() {
            storage.policy_insert(&p).await.unwrap();
        }
        storage
            .policy_insert(&tenant_policy("pol_t1", "t1"))
            .await
            .unwrap();
        storage
            .policy_insert(&tenant_policy("pol_t2", "t2"))
            .await
            .unwrap();

        let visible = storage.policy_list_visible("t1").await.unwrap();
        assert!(visible.iter().any(|p| p.policy_id == "pol_t1"));
        assert!(!visible.iter().any(|p| p.policy_id == "pol_t2"));
        assert!(visible.iter().filter(|p| p.tier == PolicyTier::System).count() >= 68);
    }

    #[tokio::test]
    async fn test_scope_listing_includes_org_rows() {
        let storage = MemoryStorage::new();
        let mut org_policy = tenant_policy("pol_org", "t1");
        org_policy.tier = PolicyTier::Organization;
        org_policy.organization_id = Some("org-1".to_string());
        storage.policy_insert(&org_policy).await.unwrap();

        let with_org = storage
            .policy_list_for_scope("t1", Some("org-1"))
            .await
            .unwrap();
        assert_eq!(with_org.len(), 1);

        let without_org = storage.policy_list_for_scope("t1", None).await.unwrap();
        assert!(without_org.is_empty());
    }

    #[tokio::test]
    async fn test_live_tenant_count_ignores_deleted() {
        let storage = MemoryStorage::new();
        let p = tenant_policy("pol_a", "t1");
        storage.policy_insert(&p).await.unwrap();
        storage
            .policy_insert(&tenant_policy("pol_b", "t1"))
            .await
            .unwrap();
        assert_eq!(storage.policy_count_live_tenant("t1").await.unwrap(), 2);

        let mut deleted = p.clone();
        deleted.deleted_at = Some(Utc::now());
        deleted.version += 1;
        storage.policy_update(&deleted, 1).await.unwrap();
        assert_eq!(storage.policy_count_live_tenant("t1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_override_scope_listing() {
        let storage = MemoryStorage::new();
        let tenant_override =
            PolicyOverride::for_tenant("sys_sqli_1", "t1", "tighten", "admin");
        let org_override =
            PolicyOverride::for_organization("sys_sqli_1", "org-1", "tighten", "admin");
        storage.override_insert(&tenant_override).await.unwrap();
        storage.override_insert(&org_override).await.unwrap();

        let both = storage
            .override_list_for_scope("t1", Some("org-1"))
            .await
            .unwrap();
        assert_eq!(both.len(), 2);

        let tenant_only = storage.override_list_for_scope("t1", None).await.unwrap();
        assert_eq!(tenant_only.len(), 1);
        assert_eq!(tenant_only[0].id, tenant_override.id);
    }

    #[tokio::test]
    async fn test_expired_override_sweep() {
        let storage = MemoryStorage::new();
        let now = Utc::now();
        let live = PolicyOverride::for_tenant("sys_sqli_1", "t1", "keep", "admin");
        let expired = PolicyOverride::for_tenant("sys_sqli_2", "t1", "drop", "admin")
            .with_expires_at(now - Duration::minutes(1));
        storage.override_insert(&live).await.unwrap();
        storage.override_insert(&expired).await.unwrap();

        let removed = storage.override_delete_expired(now).await.unwrap();
        assert_eq!(removed, 1);
        assert!(storage.override_get(live.id).await.unwrap().is_some());
        assert!(storage.override_get(expired.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_version_list_newest_first_with_limit() {
        let storage = MemoryStorage::new();
        let mut p = tenant_policy("pol_a", "t1");
        for v in 1..=7 {
            p.version = v;
            let snapshot = PolicyVersion::capture(&p, ChangeType::Update, "bump", "tester");
            storage.version_insert(&snapshot).await.unwrap();
        }

        let versions = storage.version_list("pol_a", 5).await.unwrap();
        assert_eq!(versions.len(), 5);
        assert_eq!(versions[0].version, 7);
        assert_eq!(versions[4].version, 3);
    }

    #[tokio::test]
    async fn test_context_roundtrip() {
        let storage = MemoryStorage::new();
        let now = Utc::now();
        let token = ContextToken {
            context_id: ContextId::generate(),
            client_id: "c1".to_string(),
            user_token_hash: "h".to_string(),
            query_hash: "q".to_string(),
            data_sources: vec!["postgres".to_string()],
            evaluated_policies: vec!["sys_sqli_1".to_string()],
            approved: true,
            block_reason: None,
            created_at: now,
            expires_at: now + Duration::minutes(5),
        };
        storage.context_insert(&token).await.unwrap();

        let fetched = storage.context_get(&token.context_id).await.unwrap().unwrap();
        assert_eq!(fetched, token);

        assert!(matches!(
            storage.context_insert(&token).await,
            Err(StorageError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_client_upsert_and_get() {
        let storage = MemoryStorage::new();
        assert!(storage.client_get("c1").await.unwrap().is_none());

        let client = ClientRecord::community("c1");
        storage.client_upsert(&client).await.unwrap();
        let fetched = storage.client_get("c1").await.unwrap().unwrap();
        assert_eq!(fetched.tenant_id, "c1");
    }
}
