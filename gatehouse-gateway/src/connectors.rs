//! Connector factory registry.
//!
//! Maps data-source names to connector constructors. Registration happens
//! at startup; lookups are request-hot, so the mapping sits behind a
//! read/write lock: many concurrent readers, exclusive writer. Lookups are
//! safe to call while a registration is in flight. The registry is an
//! explicit application-context value handed down from initialization, not
//! a process-global.

use gatehouse_core::{GatewayError, GatewayResult};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A live connection to a downstream data source. The actual plumbing
/// (drivers, pooling) lives in the connector crates; the gateway only needs
/// the name for context binding.
pub trait Connector: Send + Sync {
    /// Data-source name this connector serves.
    fn name(&self) -> &str;
}

/// Constructor closure for a connector, taking its opaque configuration.
pub type ConnectorFactory =
    Arc<dyn Fn(&serde_json::Value) -> GatewayResult<Box<dyn Connector>> + Send + Sync>;

/// Registry of connector factories keyed by data-source name.
#[derive(Default)]
pub struct ConnectorRegistry {
    factories: RwLock<HashMap<String, ConnectorFactory>>,
}

impl ConnectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a name. Re-registering a name replaces the
    /// previous factory.
    pub fn register(&self, name: impl Into<String>, factory: ConnectorFactory) {
        let name = name.into();
        match self.factories.write() {
            Ok(mut factories) => {
                factories.insert(name, factory);
            }
            Err(_) => {
                tracing::error!(name, "Connector registry lock poisoned during registration");
            }
        }
    }

    /// Look up a factory by name.
    pub fn lookup(&self, name: &str) -> Option<ConnectorFactory> {
        self.factories.read().ok()?.get(name).cloned()
    }

    /// Whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .map(|f| f.contains_key(name))
            .unwrap_or(false)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Instantiate a connector by name.
    pub fn build(&self, name: &str, config: &serde_json::Value) -> GatewayResult<Box<dyn Connector>> {
        let factory = self.lookup(name).ok_or_else(|| {
            GatewayError::bad_request(format!("unknown data source: {}", name))
        })?;
        factory(config)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubConnector {
        name: String,
    }

    impl Connector for StubConnector {
        fn name(&self) -> &str {
            &self.name
        }
    }

    fn stub_factory(name: &'static str) -> ConnectorFactory {
        Arc::new(move |_config| {
            Ok(Box::new(StubConnector {
                name: name.to_string(),
            }) as Box<dyn Connector>)
        })
    }

    #[test]
    fn test_register_lookup_build() {
        let registry = ConnectorRegistry::new();
        registry.register("postgres", stub_factory("postgres"));
        registry.register("mongodb", stub_factory("mongodb"));

        assert!(registry.contains("postgres"));
        assert!(!registry.contains("mysql"));
        assert_eq!(registry.names(), vec!["mongodb", "postgres"]);

        let connector = registry
            .build("postgres", &serde_json::json!({"dsn": "postgres://..."}))
            .unwrap();
        assert_eq!(connector.name(), "postgres");

        assert!(registry.build("mysql", &serde_json::Value::Null).is_err());
    }

    #[test]
    fn test_reregistration_replaces() {
        let registry = ConnectorRegistry::new();
        registry.register("postgres", stub_factory("old"));
        registry.register("postgres", stub_factory("new"));
        let connector = registry.build("postgres", &serde_json::Value::Null).unwrap();
        assert_eq!(connector.name(), "new");
    }

    #[test]
    fn test_concurrent_lookups_during_registration() {
        let registry = Arc::new(ConnectorRegistry::new());
        registry.register("postgres", stub_factory("postgres"));
        let hits = Arc::new(AtomicUsize::new(0));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                let hits = hits.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        if registry.contains("postgres") {
                            hits.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        let writer = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    registry.register(format!("source-{}", i), stub_factory("x"));
                }
            })
        };

        for handle in readers {
            handle.join().unwrap();
        }
        writer.join().unwrap();

        // Lookups never failed while registration was in flight.
        assert_eq!(hits.load(Ordering::Relaxed), 4 * 500);
        assert_eq!(registry.names().len(), 101);
    }
}
