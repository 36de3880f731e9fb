//! The pre-check / audit protocol.
//!
//! Orchestrates the two-phase gate: `pre_check` rate-limits the caller,
//! resolves and evaluates the effective policy list, and mints a context
//! token; `record_llm_call` validates the token and persists the audit
//! record. Per-request flow: limiter, resolver, evaluator, context mint -
//! in that order, observable in the context's evaluated-policy list.

use crate::audit::{AuditService, RecordLlmCall};
use crate::connectors::ConnectorRegistry;
use crate::context::{ContextService, MintRequest};
use gatehouse_core::{
    AuditRecord, ClientRecord, ContextId, GatewayConfig, GatewayError, GatewayResult, Timestamp,
    PATTERN_INPUT_CEILING,
};
use gatehouse_limiter::{RateDecision, RateLimiter};
use gatehouse_policy::{Evaluator, EffectivePolicyResolver, TriggeredRule};
use gatehouse_storage::Storage;
use std::sync::Arc;

// ============================================================================
// PROTOCOL TYPES
// ============================================================================

/// A pre-check request.
#[derive(Debug, Clone)]
pub struct PreCheckRequest {
    pub user_token: String,
    pub client_id: String,
    pub query: String,
    pub data_sources: Vec<String>,
}

/// Outcome of a pre-check. Both approvals and denials carry a context id;
/// only approvals validate for audit recording later.
#[derive(Debug, Clone)]
pub struct PreCheckOutcome {
    pub context_id: ContextId,
    pub approved: bool,
    pub block_reason: Option<String>,
    pub expires_at: Timestamp,
    /// Redacted copy of the query when redact rules fired
    pub redacted_query: Option<String>,
    /// Rules that matched, with their effective actions
    pub triggered: Vec<TriggeredRule>,
}

// ============================================================================
// GATEWAY
// ============================================================================

/// The protocol orchestrator. One instance per process, shared across
/// request handlers.
pub struct Gateway {
    config: GatewayConfig,
    limiter: Arc<RateLimiter>,
    resolver: EffectivePolicyResolver,
    evaluator: Evaluator,
    contexts: ContextService,
    audits: AuditService,
    storage: Arc<dyn Storage>,
    connectors: Arc<ConnectorRegistry>,
}

impl Gateway {
    /// Assemble the gateway from its collaborators.
    pub fn new(
        config: GatewayConfig,
        storage: Arc<dyn Storage>,
        limiter: Arc<RateLimiter>,
        connectors: Arc<ConnectorRegistry>,
    ) -> Self {
        let contexts = ContextService::new(storage.clone(), config.context_ttl);
        let audits = AuditService::new(storage.clone(), contexts.clone());
        Self {
            resolver: EffectivePolicyResolver::new(storage.clone()),
            evaluator: Evaluator::new(),
            contexts,
            audits,
            storage,
            limiter,
            connectors,
            config,
        }
    }

    /// The context service (route handlers use it for direct validation).
    pub fn contexts(&self) -> &ContextService {
        &self.contexts
    }

    /// The connector registry.
    pub fn connectors(&self) -> &ConnectorRegistry {
        &self.connectors
    }

    /// Phase one: evaluate a query and issue a context token.
    pub async fn pre_check(&self, request: PreCheckRequest) -> GatewayResult<PreCheckOutcome> {
        if request.client_id.trim().is_empty() {
            return Err(GatewayError::bad_request("client_id is required"));
        }
        if request.query.trim().is_empty() {
            return Err(GatewayError::bad_request("query is required"));
        }
        if request.query.len() > PATTERN_INPUT_CEILING {
            return Err(GatewayError::bad_request(format!(
                "query exceeds the maximum length of {} bytes",
                PATTERN_INPUT_CEILING
            )));
        }

        // The client row decides tenant identity, org membership, and the
        // per-minute budget; unregistered clients run as their own
        // community tenant.
        let client = self
            .storage
            .client_get(&request.client_id)
            .await?
            .unwrap_or_else(|| ClientRecord::community(&request.client_id));
        let limit = client
            .rate_limit_per_minute
            .unwrap_or(self.config.tenant_rate_limit);

        match self.limiter.check(&request.client_id, limit).await? {
            RateDecision::Allowed { .. } => {}
            RateDecision::Denied {
                current,
                limit,
                retry_after_secs,
            } => {
                tracing::warn!(
                    client_id = %request.client_id,
                    current,
                    limit,
                    "Pre-check rate limited"
                );
                return Err(GatewayError::RateLimited { retry_after_secs });
            }
        }

        for source in &request.data_sources {
            if !self.connectors.contains(source) {
                tracing::warn!(
                    client_id = %request.client_id,
                    data_source = %source,
                    "Pre-check references an unregistered data source"
                );
            }
        }

        let effective = self
            .resolver
            .resolve(&client.tenant_id, client.organization_id.as_deref())
            .await?;
        let evaluation = self.evaluator.evaluate(&effective, &request.query);

        let token = self
            .contexts
            .mint(MintRequest {
                approved: evaluation.verdict.is_approved(),
                block_reason: evaluation.block_reason.clone(),
                client_id: request.client_id.clone(),
                user_token: request.user_token,
                query: request.query,
                data_sources: request.data_sources,
                evaluated_policies: evaluation.evaluated_policies.clone(),
            })
            .await?;

        tracing::info!(
            context_id = %token.context_id,
            client_id = %request.client_id,
            tenant_id = %client.tenant_id,
            approved = token.approved,
            evaluated = evaluation.evaluated_policies.len(),
            triggered = evaluation.triggered.len(),
            "Pre-check decided"
        );

        Ok(PreCheckOutcome {
            context_id: token.context_id,
            approved: token.approved,
            block_reason: token.block_reason,
            expires_at: token.expires_at,
            redacted_query: evaluation.redacted_text,
            triggered: evaluation.triggered,
        })
    }

    /// Phase two: record the LLM call made under a context.
    pub async fn record_llm_call(&self, input: RecordLlmCall) -> GatewayResult<AuditRecord> {
        self.audits.record(input).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::{ContextError, LicenseTier, TokenUsage};
    use gatehouse_policy::PolicyService;
    use gatehouse_storage::MemoryStorage;

    async fn gateway_with_limit(limit: u32) -> Gateway {
        let storage = Arc::new(MemoryStorage::new());
        PolicyService::new(storage.clone(), LicenseTier::Community)
            .seed_builtin()
            .await
            .unwrap();

        let mut config = GatewayConfig::default();
        config.tenant_rate_limit = limit;
        let limiter = Arc::new(RateLimiter::local(
            config.rate_window,
            config.rate_key_ttl,
        ));
        Gateway::new(config, storage, limiter, Arc::new(ConnectorRegistry::new()))
    }

    fn benign_request() -> PreCheckRequest {
        PreCheckRequest {
            user_token: "eyJ...test".to_string(),
            client_id: "c1".to_string(),
            query: "What is the capital of France?".to_string(),
            data_sources: vec!["postgres".to_string()],
        }
    }

    #[tokio::test]
    async fn test_approved_query_then_audit() {
        let gateway = gateway_with_limit(60).await;
        let outcome = gateway.pre_check(benign_request()).await.unwrap();

        assert!(outcome.approved);
        assert!(outcome.block_reason.is_none());
        assert!(outcome.context_id.is_well_formed());
        assert!(outcome.expires_at > chrono::Utc::now());
        assert!(outcome.triggered.is_empty());

        let record = gateway
            .record_llm_call(RecordLlmCall {
                context_id: outcome.context_id,
                client_id: "c1".to_string(),
                provider: "openai".to_string(),
                model: "gpt-4".to_string(),
                usage: TokenUsage::new(50, 25, 75),
                latency_ms: 500,
                metadata: None,
            })
            .await
            .unwrap();

        assert_eq!(record.provider, "openai");
        assert_eq!(record.usage.total_tokens, 75);
        assert!((record.estimated_cost_usd - 0.00225).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_fields_are_bad_requests() {
        let gateway = gateway_with_limit(60).await;

        let mut no_query = benign_request();
        no_query.query = "  ".to_string();
        assert!(matches!(
            gateway.pre_check(no_query).await.unwrap_err(),
            GatewayError::BadRequest { .. }
        ));

        let mut no_client = benign_request();
        no_client.client_id = String::new();
        assert!(matches!(
            gateway.pre_check(no_client).await.unwrap_err(),
            GatewayError::BadRequest { .. }
        ));

        let mut oversize = benign_request();
        oversize.query = "a".repeat(PATTERN_INPUT_CEILING + 1);
        assert!(matches!(
            gateway.pre_check(oversize).await.unwrap_err(),
            GatewayError::BadRequest { .. }
        ));
    }

    #[tokio::test]
    async fn test_sql_injection_is_denied_with_context() {
        let gateway = gateway_with_limit(60).await;
        let mut request = benign_request();
        request.query = "show users where 1 UNION SELECT password FROM accounts".to_string();

        let outcome = gateway.pre_check(request).await.unwrap();
        assert!(!outcome.approved);
        let reason = outcome.block_reason.clone().unwrap();
        assert!(reason.contains("sys_sqli_1"));

        // The denied context exists but refuses audit recording.
        let err = gateway
            .record_llm_call(RecordLlmCall {
                context_id: outcome.context_id,
                client_id: "c1".to_string(),
                provider: "openai".to_string(),
                model: "gpt-4".to_string(),
                usage: TokenUsage::new(1, 1, 2),
                latency_ms: 10,
                metadata: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Context(ContextError::NotApproved { .. })
        ));
    }

    #[tokio::test]
    async fn test_pan_query_is_redacted_and_context_records_policy() {
        let gateway = gateway_with_limit(60).await;
        let mut request = benign_request();
        request.query = "Customer PAN is ABCPD1234F".to_string();

        let outcome = gateway.pre_check(request).await.unwrap();
        assert!(outcome.approved);

        let redacted = outcome.redacted_query.unwrap();
        assert!(!redacted.contains("ABCPD1234F"));
        assert!(redacted.contains("[REDACTED]"));

        assert!(outcome
            .triggered
            .iter()
            .any(|t| t.policy_id == "sys_pii_in_1"));

        // The PAN policy appears in the context's evaluated list.
        let token = gateway
            .contexts()
            .validate(&outcome.context_id, "c1")
            .await
            .unwrap();
        assert!(token
            .evaluated_policies
            .iter()
            .any(|id| id == "sys_pii_in_1"));
    }

    #[tokio::test]
    async fn test_rate_limit_denial_maps_to_rate_limited() {
        let gateway = gateway_with_limit(3).await;
        for _ in 0..4 {
            gateway.pre_check(benign_request()).await.unwrap();
        }
        let err = gateway.pre_check(benign_request()).await.unwrap_err();
        match err {
            GatewayError::RateLimited { retry_after_secs } => {
                assert!(retry_after_secs >= 1);
            }
            other => panic!("expected rate limit, got {:?}", other),
        }

        // A different client is unaffected.
        let mut other_client = benign_request();
        other_client.client_id = "c2".to_string();
        gateway.pre_check(other_client).await.unwrap();
    }

    #[tokio::test]
    async fn test_registered_client_budget_overrides_default() {
        let storage = Arc::new(MemoryStorage::new());
        PolicyService::new(storage.clone(), LicenseTier::Community)
            .seed_builtin()
            .await
            .unwrap();
        storage
            .client_upsert(&ClientRecord {
                client_id: "c1".to_string(),
                tenant_id: "tenant-1".to_string(),
                organization_id: None,
                license: LicenseTier::Enterprise,
                rate_limit_per_minute: Some(2),
            })
            .await
            .unwrap();

        let config = GatewayConfig::default();
        let limiter = Arc::new(RateLimiter::local(
            config.rate_window,
            config.rate_key_ttl,
        ));
        let gateway = Gateway::new(
            config,
            storage,
            limiter,
            Arc::new(ConnectorRegistry::new()),
        );

        // Budget 2 admits three calls (lenient window), denies the fourth.
        for _ in 0..3 {
            gateway.pre_check(benign_request()).await.unwrap();
        }
        assert!(matches!(
            gateway.pre_check(benign_request()).await.unwrap_err(),
            GatewayError::RateLimited { .. }
        ));
    }
}
