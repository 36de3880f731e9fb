//! Gatehouse Gateway - The Pre-Check / Audit Protocol
//!
//! The two-phase gate in front of downstream LLM invocation: evaluate a
//! query, issue a short-lived context token, and later record the LLM call
//! outcome against that token. Also carries the connector registry the
//! pre-check consults for data-source names.

pub mod audit;
pub mod connectors;
pub mod context;
pub mod protocol;

pub use audit::{calculate_cost, AuditService, RecordLlmCall};
pub use connectors::{Connector, ConnectorFactory, ConnectorRegistry};
pub use context::{hash_sha256, ContextService, MintRequest};
pub use protocol::{Gateway, PreCheckOutcome, PreCheckRequest};
