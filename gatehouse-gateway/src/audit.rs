//! Audit recorder.
//!
//! Persists the outcome of a downstream LLM call against its context token:
//! provider, model, token counters, latency, and an estimated cost from the
//! provider price table. Audit records are permanent.

use crate::context::ContextService;
use gatehouse_core::{
    AuditError, AuditRecord, AuditRecordId, ContextId, GatewayResult, RecordIdType, TokenUsage,
};
use gatehouse_storage::Storage;
use std::sync::Arc;

// ============================================================================
// PRICE TABLE
// ============================================================================

/// Per-1K-token USD rates by provider/model prefix. Entries for a provider
/// are ordered longest-prefix-first so `gpt-4-turbo` resolves before
/// `gpt-4`.
const PRICE_TABLE: &[(&str, &str, f64)] = &[
    ("openai", "gpt-4-turbo", 0.01),
    ("openai", "gpt-4o", 0.005),
    ("openai", "gpt-4", 0.03),
    ("openai", "gpt-3.5-turbo", 0.002),
    ("anthropic", "claude-3-opus", 0.015),
    ("anthropic", "claude-3-sonnet", 0.003),
    ("anthropic", "claude-3-haiku", 0.00025),
    ("google", "gemini-1.5-pro", 0.0035),
    ("google", "gemini-pro", 0.0005),
    ("mistral", "mistral-large", 0.008),
    ("mistral", "mistral-small", 0.002),
];

/// Providers that run locally and cost nothing per token.
const LOCAL_PROVIDERS: &[&str] = &["ollama", "llamacpp", "localai", "vllm"];

/// Conservative per-1K rate applied to unknown providers and models.
const DEFAULT_RATE_PER_1K: f64 = 0.01;

/// Estimated cost in USD for an LLM call: `total_tokens / 1000 × rate`.
pub fn calculate_cost(provider: &str, model: &str, total_tokens: i64) -> f64 {
    let provider = provider.to_lowercase();
    let model = model.to_lowercase();

    let rate = if LOCAL_PROVIDERS.contains(&provider.as_str()) {
        0.0
    } else {
        PRICE_TABLE
            .iter()
            .find(|(p, m, _)| *p == provider && model.starts_with(m))
            .map(|(_, _, rate)| *rate)
            .unwrap_or(DEFAULT_RATE_PER_1K)
    };

    total_tokens as f64 / 1000.0 * rate
}

// ============================================================================
// AUDIT SERVICE
// ============================================================================

/// Input for recording an LLM call.
#[derive(Debug, Clone)]
pub struct RecordLlmCall {
    pub context_id: ContextId,
    pub client_id: String,
    pub provider: String,
    pub model: String,
    pub usage: TokenUsage,
    pub latency_ms: i64,
    pub metadata: Option<serde_json::Value>,
}

/// Audit recording service.
#[derive(Clone)]
pub struct AuditService {
    storage: Arc<dyn Storage>,
    contexts: ContextService,
}

impl AuditService {
    /// Create a service over the storage backend and context manager.
    pub fn new(storage: Arc<dyn Storage>, contexts: ContextService) -> Self {
        Self { storage, contexts }
    }

    /// Validate and persist an LLM-call outcome. Returns the stored record.
    pub async fn record(&self, input: RecordLlmCall) -> GatewayResult<AuditRecord> {
        for (field, value) in [
            ("context_id", input.context_id.as_str()),
            ("client_id", input.client_id.as_str()),
            ("provider", input.provider.as_str()),
            ("model", input.model.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(AuditError::MissingField {
                    field: field.to_string(),
                }
                .into());
            }
        }
        for (field, value) in [
            ("prompt_tokens", input.usage.prompt_tokens),
            ("completion_tokens", input.usage.completion_tokens),
            ("total_tokens", input.usage.total_tokens),
        ] {
            if value < 0 {
                return Err(AuditError::NegativeTokens {
                    field: field.to_string(),
                }
                .into());
            }
        }

        // Audit implies an actual LLM call; only a valid, approved,
        // unexpired context bound to this client passes.
        self.contexts
            .validate(&input.context_id, &input.client_id)
            .await?;

        let record = AuditRecord {
            id: AuditRecordId::now_v7(),
            estimated_cost_usd: calculate_cost(
                &input.provider,
                &input.model,
                input.usage.total_tokens,
            ),
            context_id: input.context_id,
            client_id: input.client_id,
            provider: input.provider,
            model: input.model,
            usage: input.usage,
            latency_ms: input.latency_ms,
            metadata: input.metadata,
            created_at: chrono::Utc::now(),
        };
        self.storage.audit_insert(&record).await?;

        tracing::info!(
            audit_id = %record.id,
            context_id = %record.context_id,
            provider = %record.provider,
            model = %record.model,
            total_tokens = record.usage.total_tokens,
            cost_usd = record.estimated_cost_usd,
            latency_ms = record.latency_ms,
            "LLM call recorded"
        );
        Ok(record)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MintRequest;
    use gatehouse_core::{ContextError, GatewayError};
    use gatehouse_storage::MemoryStorage;
    use std::time::Duration;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_cost_table_known_rates() {
        assert_close(calculate_cost("openai", "gpt-4", 1000), 0.03);
        assert_close(calculate_cost("anthropic", "claude-3-sonnet", 1000), 0.003);
        assert_close(calculate_cost("ollama", "llama2", 1000), 0.0);
        assert_close(calculate_cost("unknown", "unknown", 1000), 0.01);
    }

    #[test]
    fn test_cost_scales_with_tokens() {
        assert_close(calculate_cost("openai", "gpt-4", 75), 75.0 / 1000.0 * 0.03);
        assert_close(calculate_cost("openai", "gpt-4", 0), 0.0);
    }

    #[test]
    fn test_cost_prefix_resolution() {
        // Dated model names resolve through their prefix.
        assert_close(calculate_cost("openai", "gpt-4-turbo-2024-04-09", 1000), 0.01);
        assert_close(calculate_cost("openai", "gpt-4-0613", 1000), 0.03);
        assert_close(
            calculate_cost("anthropic", "claude-3-haiku-20240307", 1000),
            0.00025,
        );
        // Provider casing is irrelevant.
        assert_close(calculate_cost("OpenAI", "GPT-4", 1000), 0.03);
        // Known provider, unknown model: conservative default.
        assert_close(calculate_cost("openai", "gpt-9", 1000), 0.01);
    }

    async fn fixture() -> (AuditService, ContextId, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let contexts = ContextService::new(storage.clone(), Duration::from_secs(300));
        let token = contexts
            .mint(MintRequest {
                approved: true,
                block_reason: None,
                client_id: "c1".to_string(),
                user_token: "tok".to_string(),
                query: "q".to_string(),
                data_sources: vec![],
                evaluated_policies: vec![],
            })
            .await
            .unwrap();
        (
            AuditService::new(storage.clone(), contexts),
            token.context_id,
            storage,
        )
    }

    fn call(context_id: ContextId) -> RecordLlmCall {
        RecordLlmCall {
            context_id,
            client_id: "c1".to_string(),
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            usage: TokenUsage::new(50, 25, 75),
            latency_ms: 500,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_record_persists_with_cost() {
        let (svc, context_id, storage) = fixture().await;
        let record = svc.record(call(context_id)).await.unwrap();

        assert_eq!(record.provider, "openai");
        assert_eq!(record.usage.total_tokens, 75);
        assert_close(record.estimated_cost_usd, 0.00225);

        let stored = storage.audit_get(record.id).await.unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_record_requires_fields() {
        let (svc, context_id, _) = fixture().await;

        let mut missing = call(context_id.clone());
        missing.provider = String::new();
        assert!(matches!(
            svc.record(missing).await.unwrap_err(),
            GatewayError::Audit(AuditError::MissingField { .. })
        ));

        let mut negative = call(context_id);
        negative.usage.prompt_tokens = -1;
        assert!(matches!(
            svc.record(negative).await.unwrap_err(),
            GatewayError::Audit(AuditError::NegativeTokens { .. })
        ));
    }

    #[tokio::test]
    async fn test_record_rejects_foreign_client() {
        let (svc, context_id, _) = fixture().await;
        let mut foreign = call(context_id);
        foreign.client_id = "c2".to_string();
        assert!(matches!(
            svc.record(foreign).await.unwrap_err(),
            GatewayError::Context(ContextError::ClientMismatch { .. })
        ));
    }
}
