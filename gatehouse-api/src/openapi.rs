//! OpenAPI documentation aggregation.

use utoipa::OpenApi;

use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::types::{
    AuditRequestBody, AuditResponseBody, CreateOverrideRequest, CreatePolicyRequest,
    EffectivePoliciesResponse, EffectivePolicyResponse, ListPoliciesResponse, MatchResultBody,
    OverrideResponse, PolicyResponse, PolicyVersionResponse, PolicyVersionsResponse,
    PreCheckRequestBody, PreCheckResponseBody, TestPatternRequest, TestPatternResponse,
    TogglePolicyRequest, TokenUsageBody, UpdatePolicyRequest,
};

/// OpenAPI document for the Gatehouse REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatehouse API",
        description = "Policy enforcement and governance gateway for LLM-backed applications",
        license(name = "MIT")
    ),
    paths(
        crate::routes::precheck::pre_check,
        crate::routes::audit::record_llm_call,
        crate::routes::policy::list_policies,
        crate::routes::policy::create_policy,
        crate::routes::policy::get_policy,
        crate::routes::policy::update_policy,
        crate::routes::policy::delete_policy,
        crate::routes::policy::toggle_policy,
        crate::routes::policy::effective_policies,
        crate::routes::policy::test_pattern,
        crate::routes::policy::get_versions,
        crate::routes::policy::create_override,
        crate::routes::policy::delete_override,
        crate::routes::health::health,
    ),
    components(schemas(
        PreCheckRequestBody,
        PreCheckResponseBody,
        AuditRequestBody,
        AuditResponseBody,
        TokenUsageBody,
        CreatePolicyRequest,
        UpdatePolicyRequest,
        TogglePolicyRequest,
        PolicyResponse,
        ListPoliciesResponse,
        EffectivePolicyResponse,
        EffectivePoliciesResponse,
        TestPatternRequest,
        TestPatternResponse,
        MatchResultBody,
        CreateOverrideRequest,
        OverrideResponse,
        PolicyVersionResponse,
        PolicyVersionsResponse,
        HealthResponse,
        HealthDetails,
        HealthStatus,
        ComponentHealth,
    )),
    tags(
        (name = "Gateway", description = "Pre-check / audit protocol"),
        (name = "Policies", description = "Policy library administration"),
        (name = "Health", description = "Service health"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("/api/policy/pre-check"));
        assert!(json.contains("/api/audit/llm-call"));
        assert!(json.contains("/api/v1/static-policies"));
    }
}
