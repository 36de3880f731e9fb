//! Gateway configuration
//!
//! Configuration is loaded from environment variables with sensible defaults
//! for development. Infrastructure endpoints (database, shared cache) are
//! optional at this layer; the components that need them decide how to
//! degrade when they are absent.

use crate::LicenseTier;
use std::time::Duration;

/// Maximum live tenant-scoped policies per tenant under a Community license.
pub const MAX_TENANT_POLICIES_COMMUNITY: usize = 30;

/// Maximum regex pattern length accepted by the validator.
pub const MAX_PATTERN_LENGTH: usize = 1000;

/// Maximum capture groups accepted by the validator.
pub const MAX_CAPTURE_GROUPS: usize = 10;

/// Per-match wall-clock budget in milliseconds.
pub const MATCH_BUDGET_MS: u64 = 100;

/// Largest input the evaluator and pattern tester will run a match against.
pub const PATTERN_INPUT_CEILING: usize = 65_536;

/// Service-wide configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Raw `DEPLOYMENT_MODE` value
    pub deployment_mode: String,

    /// License tier derived from the deployment mode
    pub license: LicenseTier,

    /// SQL storage endpoint (the out-of-process storage collaborator)
    pub database_url: Option<String>,

    /// Shared cache endpoint, `cache://host:port[/db]`
    pub cache_url: Option<String>,

    /// Context token lifetime
    pub context_ttl: Duration,

    /// Default per-customer request budget per minute
    pub tenant_rate_limit: u32,

    /// Sliding-window width for the rate limiter
    pub rate_window: Duration,

    /// TTL refreshed on rate-limit keys at every check
    pub rate_key_ttl: Duration,

    /// Whether transient cache errors during rate-limit checks allow the
    /// request through. Security-relevant: availability over strict
    /// enforcement.
    pub fail_open: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            deployment_mode: "community".to_string(),
            license: LicenseTier::Community,
            database_url: None,
            cache_url: None,
            context_ttl: Duration::from_secs(300),
            tenant_rate_limit: 60,
            rate_window: Duration::from_secs(60),
            rate_key_ttl: Duration::from_secs(120),
            fail_open: true,
        }
    }
}

impl GatewayConfig {
    /// Create a GatewayConfig from environment variables.
    ///
    /// Environment variables:
    /// - `DEPLOYMENT_MODE`: deployment class; anything other than
    ///   `community` is Enterprise-class (default: "community")
    /// - `DATABASE_URL`: SQL storage endpoint
    /// - `GATEHOUSE_CACHE_URL`: shared cache endpoint, `cache://host:port[/db]`
    /// - `GATEHOUSE_CONTEXT_TTL_SECS`: context token lifetime (default: 300)
    /// - `GATEHOUSE_TENANT_RATE_LIMIT`: requests per minute per customer
    ///   (default: 60)
    /// - `GATEHOUSE_RATE_LIMIT_FAIL_OPEN`: "true"/"false" (default: true)
    pub fn from_env() -> Self {
        let deployment_mode =
            std::env::var("DEPLOYMENT_MODE").unwrap_or_else(|_| "community".to_string());
        let license = LicenseTier::from_deployment_mode(&deployment_mode);

        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        let cache_url = std::env::var("GATEHOUSE_CACHE_URL")
            .ok()
            .filter(|s| !s.is_empty());

        let context_ttl = std::env::var("GATEHOUSE_CONTEXT_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(300));

        let tenant_rate_limit = std::env::var("GATEHOUSE_TENANT_RATE_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let fail_open = std::env::var("GATEHOUSE_RATE_LIMIT_FAIL_OPEN")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            deployment_mode,
            license,
            database_url,
            cache_url,
            context_ttl,
            tenant_rate_limit,
            rate_window: Duration::from_secs(60),
            rate_key_ttl: Duration::from_secs(120),
            fail_open,
        }
    }

    /// Whether Enterprise-gated features are available in this deployment.
    pub fn is_enterprise(&self) -> bool {
        self.license.is_enterprise()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.license, LicenseTier::Community);
        assert_eq!(config.context_ttl, Duration::from_secs(300));
        assert_eq!(config.tenant_rate_limit, 60);
        assert_eq!(config.rate_window, Duration::from_secs(60));
        assert_eq!(config.rate_key_ttl, Duration::from_secs(120));
        assert!(config.fail_open);
        assert!(!config.is_enterprise());
    }

    #[test]
    fn test_limit_constants() {
        assert_eq!(MAX_TENANT_POLICIES_COMMUNITY, 30);
        assert_eq!(MAX_PATTERN_LENGTH, 1000);
        assert_eq!(MAX_CAPTURE_GROUPS, 10);
        assert_eq!(MATCH_BUDGET_MS, 100);
    }
}
