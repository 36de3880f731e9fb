//! Enum types for Gatehouse entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// POLICY TIER
// ============================================================================

/// Authoring scope of a policy.
///
/// System policies ship with the service and are immutable; organization
/// policies apply to every tenant of an organization; tenant policies are
/// per-team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum PolicyTier {
    System,
    Organization,
    Tenant,
}

impl PolicyTier {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            PolicyTier::System => "system",
            PolicyTier::Organization => "organization",
            PolicyTier::Tenant => "tenant",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, PolicyTierParseError> {
        match s {
            "system" => Ok(PolicyTier::System),
            "organization" => Ok(PolicyTier::Organization),
            "tenant" => Ok(PolicyTier::Tenant),
            _ => Err(PolicyTierParseError(s.to_string())),
        }
    }

    /// Sort rank: system < organization < tenant.
    pub fn rank(&self) -> u8 {
        match self {
            PolicyTier::System => 0,
            PolicyTier::Organization => 1,
            PolicyTier::Tenant => 2,
        }
    }
}

impl fmt::Display for PolicyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for PolicyTier {
    type Err = PolicyTierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid policy tier string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTierParseError(pub String);

impl fmt::Display for PolicyTierParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid policy tier: {}", self.0)
    }
}

impl std::error::Error for PolicyTierParseError {}

// ============================================================================
// POLICY ACTION
// ============================================================================

/// Enforcement action taken when a policy matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum PolicyAction {
    Block,
    Redact,
    Warn,
    Log,
}

impl PolicyAction {
    /// Total restrictiveness order: block > redact > warn > log.
    pub fn restrictiveness(&self) -> u8 {
        match self {
            PolicyAction::Block => 4,
            PolicyAction::Redact => 3,
            PolicyAction::Warn => 2,
            PolicyAction::Log => 1,
        }
    }

    /// Whether replacing `base` with `self` is allowed for an override.
    /// Overrides may tighten a policy, never weaken it.
    pub fn is_at_least_as_restrictive(&self, base: PolicyAction) -> bool {
        self.restrictiveness() >= base.restrictiveness()
    }

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            PolicyAction::Block => "block",
            PolicyAction::Redact => "redact",
            PolicyAction::Warn => "warn",
            PolicyAction::Log => "log",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, PolicyActionParseError> {
        match s {
            "block" => Ok(PolicyAction::Block),
            "redact" => Ok(PolicyAction::Redact),
            "warn" => Ok(PolicyAction::Warn),
            "log" => Ok(PolicyAction::Log),
            _ => Err(PolicyActionParseError(s.to_string())),
        }
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for PolicyAction {
    type Err = PolicyActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid policy action string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyActionParseError(pub String);

impl fmt::Display for PolicyActionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid policy action: {}", self.0)
    }
}

impl std::error::Error for PolicyActionParseError {}

// ============================================================================
// SEVERITY
// ============================================================================

/// Severity classification of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, SeverityParseError> {
        match s {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(SeverityParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

/// Error when parsing an invalid severity string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityParseError(pub String);

impl fmt::Display for SeverityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid severity: {}", self.0)
    }
}

impl std::error::Error for SeverityParseError {}

// ============================================================================
// POLICY CATEGORY
// ============================================================================

/// Fixed catalog of policy categories.
///
/// Static detection categories cover injection, admin abuse, PII by
/// jurisdiction, and code hygiene; the `dynamic-*` categories classify
/// catalog-seeded dynamic policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum PolicyCategory {
    SecuritySqli,
    SecurityAdmin,
    PiiGlobal,
    PiiUs,
    PiiEu,
    PiiIndia,
    CodeSecrets,
    CodeUnsafe,
    CodeCompliance,
    DynamicRisk,
    DynamicCompliance,
    DynamicSecurity,
    DynamicCost,
    DynamicAccess,
}

impl PolicyCategory {
    /// Every category in the catalog, in canonical order.
    pub fn all() -> &'static [PolicyCategory] {
        &[
            PolicyCategory::SecuritySqli,
            PolicyCategory::SecurityAdmin,
            PolicyCategory::PiiGlobal,
            PolicyCategory::PiiUs,
            PolicyCategory::PiiEu,
            PolicyCategory::PiiIndia,
            PolicyCategory::CodeSecrets,
            PolicyCategory::CodeUnsafe,
            PolicyCategory::CodeCompliance,
            PolicyCategory::DynamicRisk,
            PolicyCategory::DynamicCompliance,
            PolicyCategory::DynamicSecurity,
            PolicyCategory::DynamicCost,
            PolicyCategory::DynamicAccess,
        ]
    }

    /// Whether this category holds dynamic (LLM-evaluated) policies.
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            PolicyCategory::DynamicRisk
                | PolicyCategory::DynamicCompliance
                | PolicyCategory::DynamicSecurity
                | PolicyCategory::DynamicCost
                | PolicyCategory::DynamicAccess
        )
    }

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            PolicyCategory::SecuritySqli => "security-sqli",
            PolicyCategory::SecurityAdmin => "security-admin",
            PolicyCategory::PiiGlobal => "pii-global",
            PolicyCategory::PiiUs => "pii-us",
            PolicyCategory::PiiEu => "pii-eu",
            PolicyCategory::PiiIndia => "pii-india",
            PolicyCategory::CodeSecrets => "code-secrets",
            PolicyCategory::CodeUnsafe => "code-unsafe",
            PolicyCategory::CodeCompliance => "code-compliance",
            PolicyCategory::DynamicRisk => "dynamic-risk",
            PolicyCategory::DynamicCompliance => "dynamic-compliance",
            PolicyCategory::DynamicSecurity => "dynamic-security",
            PolicyCategory::DynamicCost => "dynamic-cost",
            PolicyCategory::DynamicAccess => "dynamic-access",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, PolicyCategoryParseError> {
        Self::all()
            .iter()
            .find(|c| c.as_db_str() == s)
            .copied()
            .ok_or_else(|| PolicyCategoryParseError(s.to_string()))
    }
}

impl fmt::Display for PolicyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for PolicyCategory {
    type Err = PolicyCategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid category string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyCategoryParseError(pub String);

impl fmt::Display for PolicyCategoryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid policy category: {}", self.0)
    }
}

impl std::error::Error for PolicyCategoryParseError {}

// ============================================================================
// CHANGE TYPE
// ============================================================================

/// Kind of mutation recorded in a policy version snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ChangeType {
    Create,
    Update,
    Delete,
    Enable,
    Disable,
}

impl ChangeType {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::Delete => "delete",
            ChangeType::Enable => "enable",
            ChangeType::Disable => "disable",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

// ============================================================================
// POLICY KIND
// ============================================================================

/// Discriminates static (regex-evaluated) from dynamic (LLM-evaluated)
/// policies in override records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum PolicyKind {
    #[default]
    Static,
    Dynamic,
}

impl PolicyKind {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            PolicyKind::Static => "static",
            PolicyKind::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

// ============================================================================
// LICENSE TIER
// ============================================================================

/// License class derived from the deployment mode.
///
/// Anything other than `community` is treated as Enterprise-class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum LicenseTier {
    #[default]
    Community,
    Enterprise,
}

impl LicenseTier {
    /// Map a `DEPLOYMENT_MODE` value to a license tier.
    pub fn from_deployment_mode(mode: &str) -> Self {
        if mode.trim().eq_ignore_ascii_case("community") {
            LicenseTier::Community
        } else {
            LicenseTier::Enterprise
        }
    }

    /// Whether Enterprise-gated features are available.
    pub fn is_enterprise(&self) -> bool {
        matches!(self, LicenseTier::Enterprise)
    }
}

impl fmt::Display for LicenseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LicenseTier::Community => write!(f, "community"),
            LicenseTier::Enterprise => write!(f, "enterprise"),
        }
    }
}

// ============================================================================
// VERDICT
// ============================================================================

/// Outcome of evaluating a query against the effective policy list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Verdict {
    Approved,
    Denied,
}

impl Verdict {
    /// Whether the query may proceed to the LLM.
    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Approved => write!(f, "approved"),
            Verdict::Denied => write!(f, "denied"),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
