//! Pre-check route.

use axum::{extract::State, routing::post, Json, Router};
use gatehouse_gateway::{Gateway, PreCheckRequest};
use std::sync::Arc;

use crate::{
    error::ApiResult,
    state::AppState,
    types::{PreCheckRequestBody, PreCheckResponseBody},
};

/// POST /api/policy/pre-check - Evaluate a query and issue a context token.
///
/// Returns 200 for both approvals and denials; the decision is in the body.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/policy/pre-check",
    tag = "Gateway",
    request_body = PreCheckRequestBody,
    responses(
        (status = 200, description = "Decision made", body = PreCheckResponseBody),
        (status = 400, description = "Missing query or client id"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Internal error"),
    )
))]
pub async fn pre_check(
    State(gateway): State<Arc<Gateway>>,
    Json(body): Json<PreCheckRequestBody>,
) -> ApiResult<Json<PreCheckResponseBody>> {
    let outcome = gateway
        .pre_check(PreCheckRequest {
            user_token: body.user_token,
            client_id: body.client_id,
            query: body.query,
            data_sources: body.data_sources,
        })
        .await?;

    Ok(Json(PreCheckResponseBody {
        context_id: outcome.context_id.to_string(),
        approved: outcome.approved,
        block_reason: outcome.block_reason,
        expires_at: outcome.expires_at,
    }))
}

/// Create the pre-check router, nested under /api/policy.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/pre-check", post(pre_check))
}
