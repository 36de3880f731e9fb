//! Static policy CRUD routes.
//!
//! All routes require tenant context headers. Enum-valued fields arrive as
//! strings and are parsed here so that invalid values produce 400s with
//! meaningful messages.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use gatehouse_core::{
    OverrideScope, PolicyAction, PolicyCategory, PolicyKind, PolicyTier, Severity,
    StaticPolicy,
};
use gatehouse_policy::{
    pattern, CreatePolicyInput, EffectivePolicyResolver, OverrideEngine, Page, PolicyListFilter,
    PolicyService, PolicySortKey, PolicyUpdate, CreateOverrideInput,
};
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    middleware::TenantContext,
    state::AppState,
    types::{
        CreateOverrideRequest, CreatePolicyRequest, EffectivePoliciesResponse,
        EffectivePolicyResponse, ListPoliciesQuery, ListPoliciesResponse, MatchResultBody,
        OverrideResponse, PolicyResponse, PolicyVersionResponse, PolicyVersionsResponse,
        TestPatternRequest, TestPatternResponse, TogglePolicyRequest, UpdatePolicyRequest,
    },
};

// ============================================================================
// PARSING HELPERS
// ============================================================================

fn parse_category(s: &str) -> ApiResult<PolicyCategory> {
    PolicyCategory::from_db_str(s).map_err(|e| ApiError::bad_request(e.to_string()))
}

fn parse_tier(s: &str) -> ApiResult<PolicyTier> {
    PolicyTier::from_db_str(s).map_err(|e| ApiError::bad_request(e.to_string()))
}

fn parse_action(s: &str) -> ApiResult<PolicyAction> {
    PolicyAction::from_db_str(s).map_err(|e| ApiError::bad_request(e.to_string()))
}

fn parse_severity(s: &str) -> ApiResult<Severity> {
    Severity::from_db_str(s).map_err(|e| ApiError::bad_request(e.to_string()))
}

/// Visibility rule: a caller sees system policies plus their own rows.
fn ensure_visible(policy: &StaticPolicy, ctx: &TenantContext) -> ApiResult<()> {
    if policy.is_system() || policy.tenant_id == ctx.tenant_id {
        Ok(())
    } else {
        Err(ApiError::not_found(format!(
            "Policy not found: {}",
            policy.policy_id
        )))
    }
}

// ============================================================================
// LISTING AND CRUD
// ============================================================================

/// GET /api/v1/static-policies - List policies visible to the tenant.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/static-policies",
    tag = "Policies",
    params(ListPoliciesQuery),
    responses(
        (status = 200, description = "One page of policies", body = ListPoliciesResponse),
        (status = 401, description = "Missing tenant header"),
    )
))]
pub async fn list_policies(
    State(policies): State<Arc<PolicyService>>,
    ctx: TenantContext,
    Query(query): Query<ListPoliciesQuery>,
) -> ApiResult<Json<ListPoliciesResponse>> {
    let mut filter = PolicyListFilter::default();
    if let Some(category) = query.category.as_deref() {
        filter.category = Some(parse_category(category)?);
    }
    if let Some(tier) = query.tier.as_deref() {
        filter.tier = Some(parse_tier(tier)?);
    }
    filter.enabled = query.enabled;
    filter.search = query.search;
    if let Some(sort_by) = query.sort_by.as_deref() {
        filter.sort_by = PolicySortKey::from_str(sort_by)
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
    }

    let page = Page {
        page: query.page,
        page_size: query.page_size,
    };
    let result = policies.list(&ctx.tenant_id, &filter, page).await?;

    Ok(Json(ListPoliciesResponse {
        policies: result.policies.iter().map(PolicyResponse::from).collect(),
        total: result.total,
        page: result.page,
        page_size: result.page_size,
    }))
}

/// POST /api/v1/static-policies - Create a policy.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/v1/static-policies",
    tag = "Policies",
    request_body = CreatePolicyRequest,
    responses(
        (status = 201, description = "Policy created", body = PolicyResponse),
        (status = 400, description = "Invalid field or pattern"),
        (status = 403, description = "Tier, license, or quota violation"),
    )
))]
pub async fn create_policy(
    State(policies): State<Arc<PolicyService>>,
    ctx: TenantContext,
    Json(body): Json<CreatePolicyRequest>,
) -> ApiResult<impl IntoResponse> {
    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    let tier = parse_tier(&body.tier)?;
    if tier == PolicyTier::Organization && ctx.organization_id.is_none() {
        return Err(ApiError::bad_request(
            "X-Organization-ID header is required for organization-tier policies",
        ));
    }

    let mut input = CreatePolicyInput::new(
        body.name,
        parse_category(&body.category)?,
        tier,
        body.pattern,
        parse_action(&body.action)?,
        parse_severity(&body.severity)?,
    );
    input.policy_id = body.policy_id;
    input.description = body.description;
    input.priority = body.priority;
    input.enabled = body.enabled;
    input.tags = body.tags;
    input.metadata = body.metadata;
    if tier == PolicyTier::Organization {
        input.organization_id = ctx.organization_id.clone();
    }

    let policy = policies.create(input, &ctx.tenant_id, &ctx.user_id).await?;
    Ok((StatusCode::CREATED, Json(PolicyResponse::from(&policy))))
}

/// GET /api/v1/static-policies/{id} - Fetch a policy.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/static-policies/{id}",
    tag = "Policies",
    params(("id" = String, Path, description = "Stable id or policy id")),
    responses(
        (status = 200, description = "Policy found", body = PolicyResponse),
        (status = 404, description = "Policy not found"),
    )
))]
pub async fn get_policy(
    State(policies): State<Arc<PolicyService>>,
    ctx: TenantContext,
    Path(id): Path<String>,
) -> ApiResult<Json<PolicyResponse>> {
    let policy = policies.get_by_id(&id).await?;
    ensure_visible(&policy, &ctx)?;
    Ok(Json(PolicyResponse::from(&policy)))
}

/// PUT /api/v1/static-policies/{id} - Update a policy.
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/api/v1/static-policies/{id}",
    tag = "Policies",
    params(("id" = String, Path, description = "Stable id or policy id")),
    request_body = UpdatePolicyRequest,
    responses(
        (status = 200, description = "Policy updated", body = PolicyResponse),
        (status = 403, description = "System-tier policies are immutable"),
        (status = 404, description = "Policy not found"),
    )
))]
pub async fn update_policy(
    State(policies): State<Arc<PolicyService>>,
    ctx: TenantContext,
    Path(id): Path<String>,
    Json(body): Json<UpdatePolicyRequest>,
) -> ApiResult<Json<PolicyResponse>> {
    let current = policies.get_by_id(&id).await?;
    ensure_visible(&current, &ctx)?;

    let update = PolicyUpdate {
        name: body.name,
        description: body.description,
        category: body.category.as_deref().map(parse_category).transpose()?,
        pattern: body.pattern,
        action: body.action.as_deref().map(parse_action).transpose()?,
        severity: body.severity.as_deref().map(parse_severity).transpose()?,
        priority: body.priority,
        tags: body.tags,
        metadata: body.metadata,
    };

    let updated = policies.update(&id, update, &ctx.user_id).await?;
    Ok(Json(PolicyResponse::from(&updated)))
}

/// DELETE /api/v1/static-policies/{id} - Soft-delete a policy.
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/api/v1/static-policies/{id}",
    tag = "Policies",
    params(("id" = String, Path, description = "Stable id or policy id")),
    responses(
        (status = 204, description = "Policy deleted"),
        (status = 403, description = "System-tier policies cannot be deleted"),
        (status = 404, description = "Policy not found"),
    )
))]
pub async fn delete_policy(
    State(policies): State<Arc<PolicyService>>,
    ctx: TenantContext,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let current = policies.get_by_id(&id).await?;
    ensure_visible(&current, &ctx)?;
    policies.delete(&id, &ctx.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/static-policies/{id} - Toggle the enabled flag.
#[cfg_attr(feature = "openapi", utoipa::path(
    patch,
    path = "/api/v1/static-policies/{id}",
    tag = "Policies",
    params(("id" = String, Path, description = "Stable id or policy id")),
    request_body = TogglePolicyRequest,
    responses(
        (status = 200, description = "Policy toggled", body = PolicyResponse),
        (status = 403, description = "System-tier policies cannot be toggled"),
        (status = 404, description = "Policy not found"),
    )
))]
pub async fn toggle_policy(
    State(policies): State<Arc<PolicyService>>,
    ctx: TenantContext,
    Path(id): Path<String>,
    Json(body): Json<TogglePolicyRequest>,
) -> ApiResult<Json<PolicyResponse>> {
    let current = policies.get_by_id(&id).await?;
    ensure_visible(&current, &ctx)?;
    let updated = policies
        .toggle_enabled(&id, body.enabled, &ctx.user_id)
        .await?;
    Ok(Json(PolicyResponse::from(&updated)))
}

// ============================================================================
// EFFECTIVE LIST AND PATTERN TESTING
// ============================================================================

/// GET /api/v1/static-policies/effective - Resolved rule list for the tenant.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/static-policies/effective",
    tag = "Policies",
    responses(
        (status = 200, description = "Effective policies in evaluation order", body = EffectivePoliciesResponse),
        (status = 401, description = "Missing tenant header"),
    )
))]
pub async fn effective_policies(
    State(resolver): State<Arc<EffectivePolicyResolver>>,
    ctx: TenantContext,
) -> ApiResult<Json<EffectivePoliciesResponse>> {
    let effective = resolver
        .resolve(&ctx.tenant_id, ctx.organization_id.as_deref())
        .await?;
    Ok(Json(EffectivePoliciesResponse {
        policies: effective.iter().map(EffectivePolicyResponse::from).collect(),
        tenant_id: ctx.tenant_id,
        organization_id: ctx.organization_id,
    }))
}

/// POST /api/v1/static-policies/test - Validate and test a pattern.
///
/// Invalid patterns return 200 with `valid: false` and the validation error;
/// the endpoint exists to try patterns out, not to enforce them.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/v1/static-policies/test",
    tag = "Policies",
    request_body = TestPatternRequest,
    responses(
        (status = 200, description = "Validation and match results", body = TestPatternResponse),
    )
))]
pub async fn test_pattern(
    _ctx: TenantContext,
    Json(body): Json<TestPatternRequest>,
) -> ApiResult<Json<TestPatternResponse>> {
    let inputs = body.all_inputs();
    let input_refs: Vec<&str> = inputs.iter().map(String::as_str).collect();

    let cancel = AtomicBool::new(false);
    match pattern::test(&body.pattern, &input_refs, None, &cancel) {
        Ok(report) => {
            let results = report
                .results
                .iter()
                .zip(inputs.iter())
                .map(|(outcome, input)| MatchResultBody::from_outcome(input, outcome))
                .collect();
            Ok(Json(TestPatternResponse {
                valid: true,
                error: None,
                error_code: None,
                results,
                cancelled: report.cancelled,
            }))
        }
        Err(e) => Ok(Json(TestPatternResponse {
            valid: false,
            error: Some(e.to_string()),
            error_code: Some(e.code().to_string()),
            results: Vec::new(),
            cancelled: false,
        })),
    }
}

// ============================================================================
// VERSIONS AND OVERRIDES
// ============================================================================

/// GET /api/v1/static-policies/{id}/versions - Version history.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/static-policies/{id}/versions",
    tag = "Policies",
    params(("id" = String, Path, description = "Stable id or policy id")),
    responses(
        (status = 200, description = "Snapshots, newest first", body = PolicyVersionsResponse),
        (status = 404, description = "Policy not found"),
    )
))]
pub async fn get_versions(
    State(policies): State<Arc<PolicyService>>,
    ctx: TenantContext,
    Path(id): Path<String>,
) -> ApiResult<Json<PolicyVersionsResponse>> {
    let versions = policies.get_versions(&id, &ctx.tenant_id).await?;
    Ok(Json(PolicyVersionsResponse {
        policy_id: id,
        versions: versions.iter().map(PolicyVersionResponse::from).collect(),
    }))
}

/// POST /api/v1/static-policies/{id}/override - Create an override.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/v1/static-policies/{id}/override",
    tag = "Policies",
    params(("id" = String, Path, description = "Policy id of a system policy")),
    request_body = CreateOverrideRequest,
    responses(
        (status = 201, description = "Override created", body = OverrideResponse),
        (status = 400, description = "Invalid action or missing reason"),
        (status = 403, description = "Enterprise license required"),
        (status = 409, description = "Active override already exists for this scope"),
    )
))]
pub async fn create_override(
    State(overrides): State<Arc<OverrideEngine>>,
    ctx: TenantContext,
    Path(id): Path<String>,
    Json(body): Json<CreateOverrideRequest>,
) -> ApiResult<impl IntoResponse> {
    let policy_kind = match body.policy_kind.as_deref() {
        Some("static") => PolicyKind::Static,
        Some("dynamic") => PolicyKind::Dynamic,
        Some(other) => {
            return Err(ApiError::bad_request(format!(
                "Invalid policy kind: {}",
                other
            )))
        }
        // Infer from the id prefix when unspecified.
        None if id.starts_with("sys_dyn_") => PolicyKind::Dynamic,
        None => PolicyKind::Static,
    };

    let action_override = body
        .action_override
        .as_deref()
        .map(parse_action)
        .transpose()?;

    // Default the scope to the calling tenant.
    let (tenant_id, organization_id) = match (body.tenant_id, body.organization_id) {
        (None, None) => (Some(ctx.tenant_id.clone()), None),
        (tenant, org) => (tenant, org),
    };

    let record = overrides
        .create(
            CreateOverrideInput {
                policy_id: id,
                policy_kind,
                organization_id,
                tenant_id,
                action_override,
                enabled_override: body.enabled_override,
                reason: body.reason,
                expires_at: body.expires_at,
            },
            &ctx.user_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(OverrideResponse::from(&record))))
}

/// DELETE /api/v1/static-policies/{id}/override - Remove the active
/// override for the caller's scope (tenant first, then organization).
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/api/v1/static-policies/{id}/override",
    tag = "Policies",
    params(("id" = String, Path, description = "Policy id of a system policy")),
    responses(
        (status = 204, description = "Override removed"),
        (status = 404, description = "No active override for this scope"),
    )
))]
pub async fn delete_override(
    State(overrides): State<Arc<OverrideEngine>>,
    ctx: TenantContext,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let tenant_scope = OverrideScope::Tenant(ctx.tenant_id.clone());
    match overrides
        .delete_scoped(&id, &tenant_scope, &ctx.user_id)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(tenant_err) => match &ctx.organization_id {
            Some(org) => {
                let org_scope = OverrideScope::Organization(org.clone());
                overrides
                    .delete_scoped(&id, &org_scope, &ctx.user_id)
                    .await?;
                Ok(StatusCode::NO_CONTENT)
            }
            None => Err(tenant_err.into()),
        },
    }
}

// ============================================================================
// ROUTER FACTORY
// ============================================================================

/// Create the static-policy router, nested under /api/v1/static-policies.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_policies))
        .route("/", post(create_policy))
        .route("/effective", get(effective_policies))
        .route("/test", post(test_pattern))
        .route("/{id}", get(get_policy))
        .route("/{id}", put(update_policy))
        .route("/{id}", delete(delete_policy))
        .route("/{id}", patch(toggle_policy))
        .route("/{id}/versions", get(get_versions))
        .route("/{id}/override", post(create_override))
        .route("/{id}/override", delete(delete_override))
}
