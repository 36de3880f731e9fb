//! Gatehouse Storage - Storage Contract and In-Memory Implementation
//!
//! Defines the storage abstraction layer for Gatehouse entities. The
//! production SQL implementation (schema, migrations, row-level security via
//! the session-scoped `current_org_id`) lives behind this same trait in the
//! storage collaborator; this crate ships the contract plus an in-memory
//! implementation used by tests and single-process deployments.

mod memory;

pub use memory::MemoryStorage;

use async_trait::async_trait;
use gatehouse_core::{
    AuditRecord, AuditRecordId, ClientRecord, ContextId, ContextToken, OverrideId, PolicyId,
    PolicyOverride, PolicyVersion, StaticPolicy, StorageError, Timestamp,
};

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage contract for Gatehouse entities.
///
/// Backing tables: `static_policies`, `policy_overrides`,
/// `static_policy_versions`, `gateway_contexts`, `llm_call_audits`,
/// `clients`. Implementations must be thread-safe; every call observes the
/// caller's cancellation (an aborted call returns `StorageError::Cancelled`
/// or simply never resolves its future).
#[async_trait]
pub trait Storage: Send + Sync {
    // === Health ===

    /// Reachability probe. Readiness endpoints call this; implementations
    /// should touch the backing store (a trivial query, not a full scan).
    async fn ping(&self) -> StorageResult<()>;

    // === Static policy operations ===

    /// Insert a new policy row.
    async fn policy_insert(&self, policy: &StaticPolicy) -> StorageResult<()>;

    /// Fetch a policy by stable row id, including soft-deleted rows.
    async fn policy_get(&self, id: PolicyId) -> StorageResult<Option<StaticPolicy>>;

    /// Fetch a non-deleted policy by its human-readable policy id.
    async fn policy_get_by_policy_id(&self, policy_id: &str)
        -> StorageResult<Option<StaticPolicy>>;

    /// Replace a policy row under optimistic concurrency.
    ///
    /// The stored row must currently be at `expected_version`; otherwise the
    /// call fails with `StorageError::Conflict` and nothing is written.
    async fn policy_update(
        &self,
        policy: &StaticPolicy,
        expected_version: i32,
    ) -> StorageResult<()>;

    /// List non-deleted rows visible to a tenant: system-tier rows plus rows
    /// owned by the tenant itself.
    async fn policy_list_visible(&self, tenant_id: &str) -> StorageResult<Vec<StaticPolicy>>;

    /// List non-deleted rows participating in evaluation for a scope:
    /// system-tier rows, organization rows for `organization_id`, and tenant
    /// rows for `tenant_id`. Enabled filtering is the resolver's job.
    async fn policy_list_for_scope(
        &self,
        tenant_id: &str,
        organization_id: Option<&str>,
    ) -> StorageResult<Vec<StaticPolicy>>;

    /// Count live (non-deleted) tenant-tier rows owned by a tenant.
    async fn policy_count_live_tenant(&self, tenant_id: &str) -> StorageResult<usize>;

    // === Override operations ===

    /// Insert a new override row.
    async fn override_insert(&self, record: &PolicyOverride) -> StorageResult<()>;

    /// Fetch an override by id.
    async fn override_get(&self, id: OverrideId) -> StorageResult<Option<PolicyOverride>>;

    /// Delete an override by id. Returns whether a row was removed.
    async fn override_delete(&self, id: OverrideId) -> StorageResult<bool>;

    /// List every override targeting a policy, active or not.
    async fn override_list_for_policy(
        &self,
        policy_id: &str,
    ) -> StorageResult<Vec<PolicyOverride>>;

    /// List every override whose scope matches the tenant or (when present)
    /// the organization.
    async fn override_list_for_scope(
        &self,
        tenant_id: &str,
        organization_id: Option<&str>,
    ) -> StorageResult<Vec<PolicyOverride>>;

    /// Remove overrides whose expiry is at or before `now`. Returns the
    /// number of rows removed.
    async fn override_delete_expired(&self, now: Timestamp) -> StorageResult<u64>;

    // === Version snapshot operations ===

    /// Append an immutable version snapshot.
    async fn version_insert(&self, version: &PolicyVersion) -> StorageResult<()>;

    /// List snapshots for a policy, newest first, up to `limit`.
    async fn version_list(
        &self,
        policy_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<PolicyVersion>>;

    // === Context token operations ===

    /// Persist a freshly minted context token.
    async fn context_insert(&self, token: &ContextToken) -> StorageResult<()>;

    /// Fetch a context token by id.
    async fn context_get(&self, context_id: &ContextId) -> StorageResult<Option<ContextToken>>;

    // === Audit record operations ===

    /// Persist an audit record. Audit records are permanent.
    async fn audit_insert(&self, record: &AuditRecord) -> StorageResult<()>;

    /// Fetch an audit record by id.
    async fn audit_get(&self, id: AuditRecordId) -> StorageResult<Option<AuditRecord>>;

    // === Client operations (license lookup contract) ===

    /// Fetch the license row for a client.
    async fn client_get(&self, client_id: &str) -> StorageResult<Option<ClientRecord>>;

    /// Insert or replace a client row.
    async fn client_upsert(&self, client: &ClientRecord) -> StorageResult<()>;
}
