//! Policy store service.
//!
//! CRUD and versioning over the storage contract, with tier, category,
//! pattern, license, and quota enforcement. System-tier policies are seeded
//! from the built-in catalog and never mutated through this service; their
//! behavior is adjusted via overrides.

use crate::pattern;
use chrono::Utc;
use gatehouse_core::{
    builtin_static_policies, ChangeType, GatewayError, GatewayResult, LicenseTier, PolicyAction,
    PolicyCategory, PolicyError, PolicyId, PolicyTier, PolicyVersion, Severity, StaticPolicy,
    GLOBAL_TENANT, MAX_TENANT_POLICIES_COMMUNITY,
};
use gatehouse_storage::Storage;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Version snapshots returned to Community tenants.
pub const MAX_VERSION_HISTORY_COMMUNITY: usize = 5;

/// Version snapshots returned to Enterprise tenants.
pub const MAX_VERSION_HISTORY_ENTERPRISE: usize = 1000;

/// Reserved prefix for catalog-seeded policy ids.
const RESERVED_POLICY_ID_PREFIX: &str = "sys_";

// ============================================================================
// REQUEST TYPES
// ============================================================================

/// Input for creating a policy.
#[derive(Debug, Clone)]
pub struct CreatePolicyInput {
    /// Optional caller-chosen policy id; generated when absent
    pub policy_id: Option<String>,
    pub name: String,
    pub description: String,
    pub category: PolicyCategory,
    pub tier: PolicyTier,
    pub pattern: String,
    pub action: PolicyAction,
    pub severity: Severity,
    /// Zero means "use the default priority"
    pub priority: i32,
    pub enabled: bool,
    pub organization_id: Option<String>,
    pub tags: Vec<String>,
    pub metadata: serde_json::Value,
}

impl CreatePolicyInput {
    /// Minimal input with defaults matching a freshly authored policy.
    pub fn new(
        name: impl Into<String>,
        category: PolicyCategory,
        tier: PolicyTier,
        pattern: impl Into<String>,
        action: PolicyAction,
        severity: Severity,
    ) -> Self {
        Self {
            policy_id: None,
            name: name.into(),
            description: String::new(),
            category,
            tier,
            pattern: pattern.into(),
            action,
            severity,
            priority: 0,
            enabled: true,
            organization_id: None,
            tags: Vec::new(),
            metadata: serde_json::Value::Null,
        }
    }
}

/// Partial update; only present fields are applied.
#[derive(Debug, Clone, Default)]
pub struct PolicyUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<PolicyCategory>,
    pub pattern: Option<String>,
    pub action: Option<PolicyAction>,
    pub severity: Option<Severity>,
    pub priority: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<serde_json::Value>,
}

impl PolicyUpdate {
    fn is_noop(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.pattern.is_none()
            && self.action.is_none()
            && self.severity.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.metadata.is_none()
    }
}

/// Whitelisted sort columns for policy listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicySortKey {
    /// Priority desc, then name asc (the default)
    #[default]
    Priority,
    Name,
    CreatedAt,
    UpdatedAt,
}

impl FromStr for PolicySortKey {
    type Err = PolicySortKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "priority" => Ok(PolicySortKey::Priority),
            "name" => Ok(PolicySortKey::Name),
            "created_at" => Ok(PolicySortKey::CreatedAt),
            "updated_at" => Ok(PolicySortKey::UpdatedAt),
            _ => Err(PolicySortKeyParseError(s.to_string())),
        }
    }
}

/// Error when parsing a sort key outside the whitelist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySortKeyParseError(pub String);

impl std::fmt::Display for PolicySortKeyParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid sort key: {}", self.0)
    }
}

impl std::error::Error for PolicySortKeyParseError {}

/// Filters for policy listings.
#[derive(Debug, Clone, Default)]
pub struct PolicyListFilter {
    pub tier: Option<PolicyTier>,
    pub category: Option<PolicyCategory>,
    pub enabled: Option<bool>,
    /// Case-insensitive substring search over name and description
    pub search: Option<String>,
    pub sort_by: PolicySortKey,
}

/// Pagination request. Out-of-range values are normalized rather than
/// rejected: page 0 becomes 1, page_size 0 becomes the default, anything
/// above the cap is clamped.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// First page at the default size.
    pub fn first() -> Self {
        Self {
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    /// Normalize to the valid range.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            page_size: match self.page_size {
                0 => Self::DEFAULT_PAGE_SIZE,
                n => n.min(Self::MAX_PAGE_SIZE),
            },
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of policies plus paging metadata.
#[derive(Debug, Clone)]
pub struct PolicyPage {
    pub policies: Vec<StaticPolicy>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
}

// ============================================================================
// POLICY SERVICE
// ============================================================================

/// Policy CRUD service over the storage contract.
#[derive(Clone)]
pub struct PolicyService {
    storage: Arc<dyn Storage>,
    license: LicenseTier,
}

impl PolicyService {
    /// Create a service for the given storage backend and license tier.
    pub fn new(storage: Arc<dyn Storage>, license: LicenseTier) -> Self {
        Self { storage, license }
    }

    /// Seed the built-in system catalog, skipping ids that already exist.
    /// Returns the number of policies inserted.
    pub async fn seed_builtin(&self) -> GatewayResult<usize> {
        let mut inserted = 0;
        for policy in builtin_static_policies() {
            if self
                .storage
                .policy_get_by_policy_id(&policy.policy_id)
                .await?
                .is_some()
            {
                continue;
            }
            self.storage.policy_insert(&policy).await?;
            inserted += 1;
        }
        if inserted > 0 {
            tracing::info!(count = inserted, "Seeded built-in system policies");
        }
        Ok(inserted)
    }

    /// Create a tenant- or organization-tier policy.
    pub async fn create(
        &self,
        input: CreatePolicyInput,
        tenant_id: &str,
        created_by: &str,
    ) -> GatewayResult<StaticPolicy> {
        match input.tier {
            PolicyTier::System => return Err(PolicyError::SystemTierCreation.into()),
            PolicyTier::Organization => {
                if !self.license.is_enterprise() {
                    return Err(PolicyError::OrgTierRequiresEnterprise.into());
                }
                if input.organization_id.as_deref().unwrap_or("").is_empty() {
                    return Err(PolicyError::InvalidTier {
                        reason: "organization-tier policies require an organization id"
                            .to_string(),
                    }
                    .into());
                }
            }
            PolicyTier::Tenant => {
                if tenant_id.is_empty() || tenant_id == GLOBAL_TENANT {
                    return Err(PolicyError::InvalidTier {
                        reason: "tenant-tier policies require a concrete tenant".to_string(),
                    }
                    .into());
                }
            }
        }

        if input.category.is_dynamic() {
            return Err(PolicyError::InvalidCategory {
                category: input.category.to_string(),
            }
            .into());
        }

        pattern::validate(&input.pattern).map_err(PolicyError::from)?;

        if input.tier == PolicyTier::Tenant && !self.license.is_enterprise() {
            let live = self.storage.policy_count_live_tenant(tenant_id).await?;
            if live >= MAX_TENANT_POLICIES_COMMUNITY {
                return Err(PolicyError::TenantPolicyLimitReached {
                    tenant_id: tenant_id.to_string(),
                    limit: MAX_TENANT_POLICIES_COMMUNITY,
                }
                .into());
            }
        }

        let policy_id = match input.policy_id {
            Some(id) if id.starts_with(RESERVED_POLICY_ID_PREFIX) => {
                return Err(GatewayError::bad_request(format!(
                    "policy_id prefix '{}' is reserved for the built-in catalog",
                    RESERVED_POLICY_ID_PREFIX
                )));
            }
            Some(id) if !id.trim().is_empty() => id,
            _ => format!("pol_{}", Uuid::now_v7().simple()),
        };

        let mut policy = StaticPolicy::new(
            policy_id,
            input.name,
            input.category,
            input.tier,
            input.pattern,
            input.action,
            input.severity,
            tenant_id,
            created_by,
        )
        .with_description(input.description)
        .with_tags(input.tags)
        .with_metadata(input.metadata);
        policy.enabled = input.enabled;
        policy.organization_id = input.organization_id;
        if input.priority != 0 {
            policy.priority = input.priority;
        }

        self.storage.policy_insert(&policy).await?;
        self.write_snapshot(&policy, ChangeType::Create, "policy created", created_by)
            .await;

        Ok(policy)
    }

    /// Fetch a policy by stable id or human-readable policy id.
    pub async fn get_by_id(&self, id: &str) -> GatewayResult<StaticPolicy> {
        if let Ok(row_id) = PolicyId::from_str(id) {
            if let Some(policy) = self.storage.policy_get(row_id).await? {
                if !policy.is_deleted() {
                    return Ok(policy);
                }
                return Err(PolicyError::NotFound { id: id.to_string() }.into());
            }
        }
        match self.storage.policy_get_by_policy_id(id).await? {
            Some(policy) => Ok(policy),
            None => Err(PolicyError::NotFound { id: id.to_string() }.into()),
        }
    }

    /// Apply a partial update, bumping the version.
    pub async fn update(
        &self,
        id: &str,
        update: PolicyUpdate,
        updated_by: &str,
    ) -> GatewayResult<StaticPolicy> {
        let current = self.get_by_id(id).await?;
        if current.is_system() {
            return Err(PolicyError::SystemPolicyModification {
                policy_id: current.policy_id,
            }
            .into());
        }

        let mut updated = current.clone();
        if let Some(name) = update.name.clone() {
            updated.name = name;
        }
        if let Some(description) = update.description.clone() {
            updated.description = description;
        }
        if let Some(category) = update.category {
            if category.is_dynamic() {
                return Err(PolicyError::InvalidCategory {
                    category: category.to_string(),
                }
                .into());
            }
            updated.category = category;
        }
        if let Some(new_pattern) = update.pattern.clone() {
            pattern::validate(&new_pattern).map_err(PolicyError::from)?;
            updated.pattern = new_pattern;
        }
        if let Some(action) = update.action {
            updated.action = action;
        }
        if let Some(severity) = update.severity {
            updated.severity = severity;
        }
        if let Some(priority) = update.priority {
            updated.priority = priority;
        }
        if let Some(tags) = update.tags.clone() {
            updated.tags = tags;
        }
        if let Some(metadata) = update.metadata.clone() {
            updated.metadata = metadata;
        }

        updated.version = current.version + 1;
        updated.updated_at = Utc::now();
        updated.updated_by = updated_by.to_string();

        self.storage.policy_update(&updated, current.version).await?;
        let summary = if update.is_noop() {
            "no-op update".to_string()
        } else {
            "policy updated".to_string()
        };
        self.write_snapshot(&updated, ChangeType::Update, &summary, updated_by)
            .await;

        Ok(updated)
    }

    /// Soft-delete a policy.
    pub async fn delete(&self, id: &str, deleted_by: &str) -> GatewayResult<()> {
        let current = self.get_by_id(id).await?;
        if current.is_system() {
            return Err(PolicyError::SystemPolicyDeletion {
                policy_id: current.policy_id,
            }
            .into());
        }

        let mut deleted = current.clone();
        deleted.deleted_at = Some(Utc::now());
        deleted.version = current.version + 1;
        deleted.updated_at = Utc::now();
        deleted.updated_by = deleted_by.to_string();

        self.storage.policy_update(&deleted, current.version).await?;
        self.write_snapshot(&deleted, ChangeType::Delete, "policy deleted", deleted_by)
            .await;
        Ok(())
    }

    /// Enable or disable a policy, bumping the version.
    pub async fn toggle_enabled(
        &self,
        id: &str,
        enabled: bool,
        updated_by: &str,
    ) -> GatewayResult<StaticPolicy> {
        let current = self.get_by_id(id).await?;
        if current.is_system() {
            // System policies are disabled per scope via overrides, never
            // toggled globally.
            return Err(PolicyError::SystemPolicyModification {
                policy_id: current.policy_id,
            }
            .into());
        }

        let mut updated = current.clone();
        updated.enabled = enabled;
        updated.version = current.version + 1;
        updated.updated_at = Utc::now();
        updated.updated_by = updated_by.to_string();

        self.storage.policy_update(&updated, current.version).await?;
        let (change_type, summary) = if enabled {
            (ChangeType::Enable, "policy enabled")
        } else {
            (ChangeType::Disable, "policy disabled")
        };
        self.write_snapshot(&updated, change_type, summary, updated_by)
            .await;

        Ok(updated)
    }

    /// List policies visible to a tenant: system-tier rows plus the tenant's
    /// own rows, filtered, sorted, and paginated.
    pub async fn list(
        &self,
        tenant_id: &str,
        filter: &PolicyListFilter,
        page: Page,
    ) -> GatewayResult<PolicyPage> {
        let page = page.normalized();
        let mut policies = self.storage.policy_list_visible(tenant_id).await?;

        if let Some(tier) = filter.tier {
            policies.retain(|p| p.tier == tier);
        }
        if let Some(category) = filter.category {
            policies.retain(|p| p.category == category);
        }
        if let Some(enabled) = filter.enabled {
            policies.retain(|p| p.enabled == enabled);
        }
        if let Some(search) = filter.search.as_deref() {
            let needle = search.to_lowercase();
            policies.retain(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
            });
        }

        match filter.sort_by {
            PolicySortKey::Priority => policies.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then_with(|| a.name.cmp(&b.name))
            }),
            PolicySortKey::Name => policies.sort_by(|a, b| a.name.cmp(&b.name)),
            PolicySortKey::CreatedAt => {
                policies.sort_by(|a, b| b.created_at.cmp(&a.created_at))
            }
            PolicySortKey::UpdatedAt => {
                policies.sort_by(|a, b| b.updated_at.cmp(&a.updated_at))
            }
        }

        let total = policies.len();
        let start = ((page.page - 1) as usize).saturating_mul(page.page_size as usize);
        let policies = policies
            .into_iter()
            .skip(start)
            .take(page.page_size as usize)
            .collect();

        Ok(PolicyPage {
            policies,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    /// Version history for a policy, newest first. Community tenants see the
    /// last few snapshots; Enterprise tenants see the full history.
    pub async fn get_versions(
        &self,
        policy_id: &str,
        tenant_id: &str,
    ) -> GatewayResult<Vec<PolicyVersion>> {
        let policy = self.get_by_id(policy_id).await?;
        if !policy.is_system() && policy.tenant_id != tenant_id {
            return Err(PolicyError::NotFound {
                id: policy_id.to_string(),
            }
            .into());
        }

        let limit = if self.license.is_enterprise() {
            MAX_VERSION_HISTORY_ENTERPRISE
        } else {
            MAX_VERSION_HISTORY_COMMUNITY
        };
        Ok(self.storage.version_list(&policy.policy_id, limit).await?)
    }

    /// Best-effort version snapshot. Failure never rolls back the primary
    /// mutation; it is logged and swallowed.
    async fn write_snapshot(
        &self,
        policy: &StaticPolicy,
        change_type: ChangeType,
        summary: &str,
        actor: &str,
    ) {
        let snapshot = PolicyVersion::capture(policy, change_type, summary, actor);
        if let Err(e) = self.storage.version_insert(&snapshot).await {
            tracing::warn!(
                policy_id = %policy.policy_id,
                version = policy.version,
                error = %e,
                "Failed to write version snapshot"
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
