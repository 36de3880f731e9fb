//! Identity types for Gatehouse entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp alias used across the workspace.
pub type Timestamp = DateTime<Utc>;

/// Sentinel tenant id for system-tier records visible to every tenant.
pub const GLOBAL_TENANT: &str = "global";

// ============================================================================
// RECORD ID TYPE SYSTEM
// ============================================================================

/// Trait for type-safe record IDs.
///
/// Each persisted entity has its own strongly-typed ID so that, for example,
/// an override id can never be passed where a version id is expected.
pub trait RecordIdType:
    Copy
    + Clone
    + Eq
    + PartialEq
    + Hash
    + fmt::Debug
    + fmt::Display
    + FromStr
    + Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// The name of the entity type (e.g., "policy", "override").
    const ENTITY_NAME: &'static str;

    /// Create a new ID from a UUID.
    fn new(uuid: Uuid) -> Self;

    /// Get the underlying UUID.
    fn as_uuid(&self) -> Uuid;

    /// Create a new timestamp-sortable UUIDv7 ID.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// Create a nil (all zeros) ID.
    fn nil() -> Self {
        Self::new(Uuid::nil())
    }
}

/// Error type for parsing record IDs from strings.
#[derive(Debug, Clone)]
pub struct RecordIdParseError {
    pub entity_name: &'static str,
    pub input: String,
    pub source: uuid::Error,
}

impl fmt::Display for RecordIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to parse {} ID from '{}': {}",
            self.entity_name, self.input, self.source
        )
    }
}

impl std::error::Error for RecordIdParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Macro to define a type-safe record ID newtype.
macro_rules! define_record_id {
    ($name:ident, $entity:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        pub struct $name(Uuid);

        impl RecordIdType for $name {
            const ENTITY_NAME: &'static str = $entity;

            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = RecordIdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|source| RecordIdParseError {
                        entity_name: $entity,
                        input: s.to_string(),
                        source,
                    })
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_record_id!(PolicyId, "policy", "Stable row id of a static policy.");
define_record_id!(OverrideId, "override", "Id of a policy override record.");
define_record_id!(
    PolicyVersionId,
    "policy_version",
    "Id of an immutable policy version snapshot."
);
define_record_id!(AuditRecordId, "audit_record", "Id of an LLM-call audit record.");

// ============================================================================
// CONTEXT ID
// ============================================================================

/// Opaque identifier binding an approved pre-check to a subsequent LLM call.
///
/// Rendered as `ctx_<uuid-simple>`; clients treat it as an opaque string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ContextId(String);

impl ContextId {
    /// Prefix shared by every context id.
    pub const PREFIX: &'static str = "ctx_";

    /// Generate a fresh, globally-unique context id.
    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, Uuid::now_v7().simple()))
    }

    /// Wrap an id received on the wire. No validation beyond non-emptiness;
    /// lookups decide whether the id refers to anything.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// View the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id carries the canonical prefix.
    pub fn is_well_formed(&self) -> bool {
        self.0.starts_with(Self::PREFIX) && self.0.len() > Self::PREFIX.len()
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({})", self.0)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContextId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContextId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_roundtrip() {
        let id = PolicyId::now_v7();
        let parsed: PolicyId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_record_id_parse_error() {
        let err = "not-a-uuid".parse::<OverrideId>().unwrap_err();
        assert_eq!(err.entity_name, "override");
        assert!(err.to_string().contains("not-a-uuid"));
    }

    #[test]
    fn test_record_ids_are_distinct_types() {
        // Compile-time property: PolicyId and OverrideId cannot be mixed up.
        fn takes_policy_id(_: PolicyId) {}
        takes_policy_id(PolicyId::nil());
    }

    #[test]
    fn test_context_id_generate() {
        let a = ContextId::generate();
        let b = ContextId::generate();
        assert_ne!(a, b);
        assert!(a.is_well_formed());
        assert!(a.as_str().starts_with("ctx_"));
    }

    #[test]
    fn test_context_id_from_wire() {
        let id = ContextId::from_string("ctx_0123");
        assert!(id.is_well_formed());
        let bare = ContextId::from_string("something-else");
        assert!(!bare.is_well_formed());
    }

    #[test]
    fn test_context_id_serde_transparent() {
        let id = ContextId::from_string("ctx_abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ctx_abc\"");
    }
}
