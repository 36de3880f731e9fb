//! Gatehouse Policy - Validation, Storage Services, and Evaluation
//!
//! The policy engine: pattern validation with safety caps, the policy store
//! service with tier/license enforcement, the override engine, the
//! effective-policy resolver, and the query evaluator.

pub mod evaluator;
pub mod overrides;
pub mod pattern;
pub mod resolver;
pub mod store;

pub use evaluator::{Evaluation, Evaluator, TriggeredRule, REDACTION_MARKER};
pub use overrides::{CreateOverrideInput, OverrideEngine};
pub use pattern::{MatchOutcome, TestReport};
pub use resolver::{EffectivePolicy, EffectivePolicyResolver};
pub use store::{
    CreatePolicyInput, Page, PolicyListFilter, PolicyPage, PolicyService, PolicySortKey,
    PolicySortKeyParseError, PolicyUpdate, MAX_VERSION_HISTORY_COMMUNITY,
    MAX_VERSION_HISTORY_ENTERPRISE,
};
