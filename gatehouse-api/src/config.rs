//! API Configuration Module
//!
//! Transport-level configuration: CORS and the per-IP/per-tenant request
//! limits guarding the admin surface. Loaded from environment variables
//! with sensible defaults for development. (The per-customer sliding-window
//! limiter in the pre-check path is configured separately via
//! `GatewayConfig`.)

use std::time::Duration;

/// API configuration for CORS and transport rate limiting.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether transport rate limiting is enabled.
    pub rate_limit_enabled: bool,

    /// Rate limit for requests without tenant context (per IP, per minute).
    pub rate_limit_unauthenticated: u32,

    /// Rate limit for tenant-scoped requests (per tenant, per minute).
    pub rate_limit_authenticated: u32,

    /// Burst capacity beyond the steady-state limit.
    pub rate_limit_burst: u32,

    /// Window size for transport rate limiting.
    pub rate_limit_window: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(), // Empty = allow all
            rate_limit_enabled: true,
            rate_limit_unauthenticated: 100,
            rate_limit_authenticated: 1000,
            rate_limit_burst: 10,
            rate_limit_window: Duration::from_secs(60),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `GATEHOUSE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `GATEHOUSE_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `GATEHOUSE_RATE_LIMIT_UNAUTHENTICATED`: Requests per minute per IP (default: 100)
    /// - `GATEHOUSE_RATE_LIMIT_AUTHENTICATED`: Requests per minute per tenant (default: 1000)
    /// - `GATEHOUSE_RATE_LIMIT_BURST`: Burst capacity (default: 10)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("GATEHOUSE_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let rate_limit_enabled = std::env::var("GATEHOUSE_RATE_LIMIT_ENABLED")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        let rate_limit_unauthenticated = std::env::var("GATEHOUSE_RATE_LIMIT_UNAUTHENTICATED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        let rate_limit_authenticated = std::env::var("GATEHOUSE_RATE_LIMIT_AUTHENTICATED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000);

        let rate_limit_burst = std::env::var("GATEHOUSE_RATE_LIMIT_BURST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Self {
            cors_origins,
            rate_limit_enabled,
            rate_limit_unauthenticated,
            rate_limit_authenticated,
            rate_limit_burst,
            rate_limit_window: Duration::from_secs(60),
        }
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            // Dev mode: allow all
            return true;
        }
        self.cors_origins.iter().any(|allowed| allowed == origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert!(config.rate_limit_enabled);
        assert_eq!(config.rate_limit_unauthenticated, 100);
        assert_eq!(config.rate_limit_authenticated, 1000);
        assert_eq!(config.rate_limit_burst, 10);
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
    }

    #[test]
    fn test_origin_allowed() {
        let mut config = ApiConfig::default();
        assert!(config.is_origin_allowed("https://anything.example"));

        config.cors_origins = vec!["https://app.gatehouse.run".to_string()];
        assert!(config.is_origin_allowed("https://app.gatehouse.run"));
        assert!(!config.is_origin_allowed("https://evil.example"));
    }
}
