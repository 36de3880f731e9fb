//! Audit route.

use axum::{extract::State, routing::post, Json, Router};
use gatehouse_core::ContextId;
use gatehouse_gateway::{Gateway, RecordLlmCall};
use std::sync::Arc;

use crate::{
    error::ApiResult,
    state::AppState,
    types::{AuditRequestBody, AuditResponseBody},
};

/// POST /api/audit/llm-call - Record an LLM call against its context.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/audit/llm-call",
    tag = "Gateway",
    request_body = AuditRequestBody,
    responses(
        (status = 200, description = "Call recorded", body = AuditResponseBody),
        (status = 400, description = "Missing required field"),
        (status = 403, description = "Context expired, denied, or bound to another client"),
        (status = 404, description = "Context not found"),
    )
))]
pub async fn record_llm_call(
    State(gateway): State<Arc<Gateway>>,
    Json(body): Json<AuditRequestBody>,
) -> ApiResult<Json<AuditResponseBody>> {
    // Fold the optional response summary into the metadata blob; the audit
    // record itself keeps a fixed shape.
    let metadata = match (body.metadata, body.response_summary) {
        (metadata, None) => metadata,
        (None, Some(summary)) => Some(serde_json::json!({ "response_summary": summary })),
        (Some(mut metadata), Some(summary)) => {
            if let Some(object) = metadata.as_object_mut() {
                object.insert(
                    "response_summary".to_string(),
                    serde_json::Value::String(summary),
                );
            }
            Some(metadata)
        }
    };

    let record = gateway
        .record_llm_call(RecordLlmCall {
            context_id: ContextId::from_string(body.context_id),
            client_id: body.client_id,
            provider: body.provider,
            model: body.model,
            usage: body.token_usage.into(),
            latency_ms: body.latency_ms,
            metadata,
        })
        .await?;

    Ok(Json(AuditResponseBody::from(&record)))
}

/// Create the audit router, nested under /api/audit.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/llm-call", post(record_llm_call))
}
