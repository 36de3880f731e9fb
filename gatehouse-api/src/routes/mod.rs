//! REST API Routes Module
//!
//! Route handlers organized by surface: the gateway protocol
//! (pre-check/audit), the policy admin CRUD, and health.

pub mod audit;
pub mod health;
pub mod policy;
pub mod precheck;

use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::middleware::{transport_rate_limit_middleware, RateLimitState};
use crate::state::AppState;

// Re-export route creation functions for convenience
pub use audit::create_router as audit_router;
pub use health::create_router as health_router;
pub use policy::create_router as policy_router;
pub use precheck::create_router as precheck_router;

/// Handler for /openapi.json endpoint.
#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

/// Create the complete API router.
///
/// - Gateway protocol under /api/policy and /api/audit
/// - Policy admin CRUD under /api/v1/static-policies
/// - /health, and /openapi.json when the openapi feature is enabled
/// - Transport rate limiting, request tracing, and CORS layered outermost
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> Router {
    let rate_limit_state = RateLimitState::new(api_config.clone());

    let cors = if api_config.cors_origins.is_empty() {
        // Dev mode: allow all origins.
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = api_config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let router = Router::new()
        .nest("/api/policy", precheck::create_router())
        .nest("/api/audit", audit::create_router())
        .nest("/api/v1/static-policies", policy::create_router())
        .merge(health::create_router());

    #[cfg(feature = "openapi")]
    let router = router.route("/openapi.json", axum::routing::get(openapi_json));

    router
        .layer(middleware::from_fn_with_state(
            rate_limit_state,
            transport_rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use gatehouse_core::{GatewayConfig, LicenseTier};
    use gatehouse_gateway::{ConnectorRegistry, Gateway};
    use gatehouse_limiter::RateLimiter;
    use gatehouse_policy::{EffectivePolicyResolver, OverrideEngine, PolicyService};
    use gatehouse_storage::MemoryStorage;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    async fn test_app(license: LicenseTier, tenant_rate_limit: u32) -> Router {
        let storage = Arc::new(MemoryStorage::new());
        let policies = Arc::new(PolicyService::new(storage.clone(), license));
        policies.seed_builtin().await.unwrap();

        let mut config = GatewayConfig::default();
        config.license = license;
        config.tenant_rate_limit = tenant_rate_limit;

        let limiter = Arc::new(RateLimiter::local(
            config.rate_window,
            config.rate_key_ttl,
        ));
        let gateway = Arc::new(Gateway::new(
            config,
            storage.clone(),
            limiter.clone(),
            Arc::new(ConnectorRegistry::new()),
        ));

        let state = AppState {
            gateway,
            overrides: Arc::new(OverrideEngine::new(storage.clone(), license)),
            resolver: Arc::new(EffectivePolicyResolver::new(storage.clone())),
            policies,
            storage,
            limiter,
            start_time: std::time::Instant::now(),
        };

        // Transport limits stay out of the way in functional tests.
        let api_config = ApiConfig {
            rate_limit_enabled: false,
            ..Default::default()
        };
        create_api_router(state, &api_config)
    }

    async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        send_json_with_headers(app, method, uri, body, &[("x-tenant-id", "t1")]).await
    }

    async fn send_json_with_headers(
        app: &Router,
        method: &str,
        uri: &str,
        body: Value,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn pre_check_body(query: &str) -> Value {
        json!({
            "user_token": "eyJ...test",
            "client_id": "c1",
            "query": query,
            "data_sources": ["postgres"],
        })
    }

    #[tokio::test]
    async fn test_pre_check_then_audit_end_to_end() {
        let app = test_app(LicenseTier::Community, 60).await;

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/policy/pre-check",
            pre_check_body("What is the capital of France?"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["approved"], true);
        let context_id = body["context_id"].as_str().unwrap().to_string();
        assert!(!context_id.is_empty());
        assert!(body.get("block_reason").is_none());

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/audit/llm-call",
            json!({
                "context_id": context_id,
                "client_id": "c1",
                "provider": "openai",
                "model": "gpt-4",
                "token_usage": {"prompt_tokens": 50, "completion_tokens": 25, "total_tokens": 75},
                "latency_ms": 500,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(!body["audit_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pre_check_missing_fields_is_400() {
        let app = test_app(LicenseTier::Community, 60).await;
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/policy/pre-check",
            json!({"user_token": "t", "client_id": "c1", "query": ""}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 400);
    }

    #[tokio::test]
    async fn test_pre_check_rate_limited_is_429() {
        let app = test_app(LicenseTier::Community, 3).await;
        for _ in 0..4 {
            let (status, _) = send_json(
                &app,
                "POST",
                "/api/policy/pre-check",
                pre_check_body("hello"),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/policy/pre-check",
            pre_check_body("hello"),
        )
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], 429);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Retry after"));
    }

    #[tokio::test]
    async fn test_denied_pre_check_is_200_with_reason() {
        let app = test_app(LicenseTier::Community, 60).await;
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/policy/pre-check",
            pre_check_body("1 UNION SELECT password FROM users"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["approved"], false);
        assert!(body["block_reason"].as_str().unwrap().contains("sys_sqli_1"));
    }

    #[tokio::test]
    async fn test_policy_list_requires_tenant_header() {
        let app = test_app(LicenseTier::Community, 60).await;
        let (status, body) = send_json_with_headers(
            &app,
            "GET",
            "/api/v1/static-policies",
            Value::Null,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], 401);
    }

    #[tokio::test]
    async fn test_policy_crud_lifecycle() {
        let app = test_app(LicenseTier::Community, 60).await;

        // Create.
        let (status, created) = send_json(
            &app,
            "POST",
            "/api/v1/static-policies",
            json!({
                "name": "No internal hosts",
                "description": "Flags internal host names",
                "category": "code-compliance",
                "tier": "tenant",
                "pattern": r"\binternal\.example\b",
                "action": "warn",
                "severity": "low",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["version"], 1);
        assert_eq!(created["priority"], 50);
        let policy_id = created["policy_id"].as_str().unwrap().to_string();

        // Fetch.
        let uri = format!("/api/v1/static-policies/{}", policy_id);
        let (status, fetched) = send_json(&app, "GET", &uri, Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "No internal hosts");

        // Update.
        let (status, updated) =
            send_json(&app, "PUT", &uri, json!({"name": "Internal host names"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Internal host names");
        assert_eq!(updated["version"], 2);

        // Toggle.
        let (status, toggled) = send_json(&app, "PATCH", &uri, json!({"enabled": false})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(toggled["enabled"], false);
        assert_eq!(toggled["version"], 3);

        // Versions, newest first.
        let versions_uri = format!("{}/versions", uri);
        let (status, versions) = send_json(&app, "GET", &versions_uri, Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        let list = versions["versions"].as_array().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0]["version"], 3);
        assert_eq!(list[0]["change_type"], "disable");

        // Delete, then 404.
        let (status, _) = send_json(&app, "DELETE", &uri, Value::Null).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send_json(&app, "GET", &uri, Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_system_policy_mutation_is_403() {
        let app = test_app(LicenseTier::Community, 60).await;
        let (status, body) = send_json(
            &app,
            "PUT",
            "/api/v1/static-policies/sys_sqli_1",
            json!({"name": "weakened"}),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], 403);

        let (status, _) = send_json(
            &app,
            "DELETE",
            "/api/v1/static-policies/sys_sqli_1",
            Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_org_tier_requires_enterprise_and_header() {
        let community = test_app(LicenseTier::Community, 60).await;
        let body = json!({
            "name": "Org rule",
            "category": "pii-global",
            "tier": "organization",
            "pattern": r"\bx\b",
            "action": "warn",
            "severity": "low",
        });

        // Missing org header: 400.
        let (status, _) = send_json(&community, "POST", "/api/v1/static-policies", body.clone())
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Community license with the header: 403.
        let (status, _) = send_json_with_headers(
            &community,
            "POST",
            "/api/v1/static-policies",
            body.clone(),
            &[("x-tenant-id", "t1"), ("x-organization-id", "org-1")],
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Enterprise with the header: created.
        let enterprise = test_app(LicenseTier::Enterprise, 60).await;
        let (status, created) = send_json_with_headers(
            &enterprise,
            "POST",
            "/api/v1/static-policies",
            body,
            &[("x-tenant-id", "t1"), ("x-organization-id", "org-1")],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["organization_id"], "org-1");
    }

    #[tokio::test]
    async fn test_effective_listing_reflects_overrides() {
        let app = test_app(LicenseTier::Enterprise, 60).await;

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/static-policies/sys_pii_in_1/override",
            json!({"action_override": "block", "reason": "incident"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send_json(
            &app,
            "GET",
            "/api/v1/static-policies/effective",
            Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let policies = body["policies"].as_array().unwrap();
        let pan = policies
            .iter()
            .find(|p| p["policy_id"] == "sys_pii_in_1")
            .unwrap();
        assert_eq!(pan["effective_action"], "block");
        assert_eq!(pan["action"], "redact");
        assert_eq!(pan["overridden"], true);
    }

    #[tokio::test]
    async fn test_weakening_override_is_400_and_duplicate_is_409() {
        let app = test_app(LicenseTier::Enterprise, 60).await;

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/static-policies/sys_sqli_1/override",
            json!({"action_override": "warn", "reason": "rollout"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("weaker"));

        let create = json!({"enabled_override": false, "reason": "noisy"});
        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/static-policies/sys_sqli_1/override",
            create.clone(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/static-policies/sys_sqli_1/override",
            create,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        // Remove, then the scope is clean again.
        let (status, _) = send_json(
            &app,
            "DELETE",
            "/api/v1/static-policies/sys_sqli_1/override",
            Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_pattern_test_endpoint() {
        let app = test_app(LicenseTier::Community, 60).await;

        // Valid pattern with a match.
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/static-policies/test",
            json!({"pattern": r"\btest\b", "input": "a test here"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["results"][0]["matched"], true);
        assert_eq!(body["results"][0]["matched_text"], "test");

        // Invalid syntax.
        let (_, body) = send_json(
            &app,
            "POST",
            "/api/v1/static-policies/test",
            json!({"pattern": "[invalid", "input": "x"}),
        )
        .await;
        assert_eq!(body["valid"], false);
        assert_eq!(body["error_code"], "invalid_syntax");

        // Dangerous shape.
        let (_, body) = send_json(
            &app,
            "POST",
            "/api/v1/static-policies/test",
            json!({"pattern": "(.*)+", "input": "x"}),
        )
        .await;
        assert_eq!(body["valid"], false);
        assert_eq!(body["error_code"], "dangerous_shape");
    }

    #[tokio::test]
    async fn test_list_pagination_and_filters() {
        let app = test_app(LicenseTier::Community, 60).await;

        let (status, body) = send_json(
            &app,
            "GET",
            "/api/v1/static-policies?page_size=1000&category=security-sqli",
            Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page_size"], 100);
        let policies = body["policies"].as_array().unwrap();
        assert!(policies.len() >= 10);
        assert!(policies.iter().all(|p| p["category"] == "security-sqli"));

        let (status, body) = send_json(
            &app,
            "GET",
            "/api/v1/static-policies?category=not-a-category",
            Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 400);
    }

    #[tokio::test]
    async fn test_health_endpoint_reports_backends() {
        let app = test_app(LicenseTier::Community, 60).await;
        let (status, body) =
            send_json_with_headers(&app, "GET", "/health", Value::Null, &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["details"]["storage"]["status"], "healthy");
        assert_eq!(body["details"]["cache"]["status"], "healthy");
        assert!(body["details"]["uptime_secs"].is_u64());
    }
}
