//! Context token manager.
//!
//! Mints and validates the short-lived approval tokens that bind an
//! evaluated query to a later LLM invocation. A denied pre-check still
//! mints a context (the denial is auditable) but validation refuses it for
//! audit recording, since an audit implies an actual LLM call.

use chrono::Utc;
use gatehouse_core::{ContextError, ContextId, ContextToken, GatewayResult, Timestamp};
use gatehouse_storage::Storage;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// SHA-256 hex digest, used for the token and query bindings.
pub fn hash_sha256(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Everything needed to mint a context.
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub approved: bool,
    pub block_reason: Option<String>,
    pub client_id: String,
    /// Raw user token; stored only as a hash
    pub user_token: String,
    /// Raw query text; stored only as a hash
    pub query: String,
    pub data_sources: Vec<String>,
    pub evaluated_policies: Vec<String>,
}

/// Context token mint/validate service.
#[derive(Clone)]
pub struct ContextService {
    storage: Arc<dyn Storage>,
    ttl: Duration,
}

impl ContextService {
    /// Create a service with the configured context TTL.
    pub fn new(storage: Arc<dyn Storage>, ttl: Duration) -> Self {
        Self { storage, ttl }
    }

    /// Context lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint and persist a context for a pre-check verdict.
    pub async fn mint(&self, request: MintRequest) -> GatewayResult<ContextToken> {
        let now = Utc::now();
        let token = ContextToken {
            context_id: ContextId::generate(),
            client_id: request.client_id,
            user_token_hash: hash_sha256(&request.user_token),
            query_hash: hash_sha256(&request.query),
            data_sources: request.data_sources,
            evaluated_policies: request.evaluated_policies,
            approved: request.approved,
            block_reason: request.block_reason,
            created_at: now,
            expires_at: now
                + chrono::Duration::from_std(self.ttl)
                    .unwrap_or_else(|_| chrono::Duration::seconds(300)),
        };
        self.storage.context_insert(&token).await?;
        Ok(token)
    }

    /// Validate a context for audit recording.
    ///
    /// Rejects unknown ids, expired contexts, contexts bound to a different
    /// client, and contexts minted for denied pre-checks.
    pub async fn validate(
        &self,
        context_id: &ContextId,
        client_id: &str,
    ) -> GatewayResult<ContextToken> {
        self.validate_at(context_id, client_id, Utc::now()).await
    }

    /// Validation with an explicit clock (tests).
    pub async fn validate_at(
        &self,
        context_id: &ContextId,
        client_id: &str,
        now: Timestamp,
    ) -> GatewayResult<ContextToken> {
        let token = self
            .storage
            .context_get(context_id)
            .await?
            .ok_or_else(|| ContextError::NotFound {
                context_id: context_id.clone(),
            })?;

        if token.is_expired(now) {
            return Err(ContextError::Expired {
                context_id: context_id.clone(),
            }
            .into());
        }
        if token.client_id != client_id {
            return Err(ContextError::ClientMismatch {
                context_id: context_id.clone(),
            }
            .into());
        }
        if !token.approved {
            return Err(ContextError::NotApproved {
                context_id: context_id.clone(),
            }
            .into());
        }
        Ok(token)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::GatewayError;
    use gatehouse_storage::MemoryStorage;

    fn service() -> ContextService {
        ContextService::new(Arc::new(MemoryStorage::new()), Duration::from_secs(300))
    }

    fn approved_request() -> MintRequest {
        MintRequest {
            approved: true,
            block_reason: None,
            client_id: "c1".to_string(),
            user_token: "eyJ...test".to_string(),
            query: "What is the capital of France?".to_string(),
            data_sources: vec!["postgres".to_string()],
            evaluated_policies: vec!["sys_sqli_1".to_string()],
        }
    }

    #[tokio::test]
    async fn test_mint_binds_hashes_and_expiry() {
        let svc = service();
        let token = svc.mint(approved_request()).await.unwrap();

        assert!(token.context_id.is_well_formed());
        assert!(token.approved);
        assert_eq!(token.user_token_hash, hash_sha256("eyJ...test"));
        assert_eq!(
            token.query_hash,
            hash_sha256("What is the capital of France?")
        );
        // expires_at - created_at is exactly the configured TTL.
        assert_eq!((token.expires_at - token.created_at).num_seconds(), 300);
    }

    #[tokio::test]
    async fn test_validate_round_trip() {
        let svc = service();
        let minted = svc.mint(approved_request()).await.unwrap();
        let validated = svc.validate(&minted.context_id, "c1").await.unwrap();
        assert_eq!(validated, minted);
    }

    #[tokio::test]
    async fn test_validate_unknown_context() {
        let svc = service();
        let err = svc
            .validate(&ContextId::from_string("ctx_missing"), "c1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Context(ContextError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_other_client() {
        let svc = service();
        let minted = svc.mint(approved_request()).await.unwrap();
        let err = svc.validate(&minted.context_id, "c2").await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Context(ContextError::ClientMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_expired() {
        let svc = service();
        let minted = svc.mint(approved_request()).await.unwrap();
        let later = minted.expires_at + chrono::Duration::seconds(1);
        let err = svc
            .validate_at(&minted.context_id, "c1", later)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Context(ContextError::Expired { .. })
        ));
    }

    #[tokio::test]
    async fn test_denied_context_minted_but_unusable() {
        let svc = service();
        let mut request = approved_request();
        request.approved = false;
        request.block_reason = Some("blocked by policy sys_sqli_1".to_string());

        // The denial still gets a context id for auditability...
        let minted = svc.mint(request).await.unwrap();
        assert!(!minted.approved);
        assert!(minted.block_reason.is_some());

        // ...but it never validates for audit recording.
        let err = svc.validate(&minted.context_id, "c1").await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Context(ContextError::NotApproved { .. })
        ));
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let a = hash_sha256("abc");
        let b = hash_sha256("abc");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_sha256("abd"));
    }
}
