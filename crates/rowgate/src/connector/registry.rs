//! Scheme to connector lookup.
//!
//! Connectors are found in two places: factories registered at runtime on a
//! [`ConnectorRegistry`], and [`ConnectorRegistration`] entries submitted with
//! `inventory::submit!` anywhere in the final binary. Runtime factories win.

use super::SharedConnector;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Connector registration for link-time discovery.
///
/// ```ignore
/// inventory::submit! {
///     rowgate::connector::ConnectorRegistration {
///         scheme: "sqlite",
///         factory: new_sqlite_connector,
///     }
/// }
/// ```
pub struct ConnectorRegistration {
    /// Lowercase URL scheme.
    pub scheme: &'static str,
    /// Creates a fresh, unconnected connector.
    pub factory: fn() -> SharedConnector,
}

inventory::collect!(ConnectorRegistration);

/// Runtime connector factory.
pub type ConnectorFactory = Arc<dyn Fn() -> SharedConnector + Send + Sync>;

#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    factories: HashMap<String, ConnectorFactory>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for a scheme.
    pub fn register<F>(&mut self, scheme: &str, factory: F) -> &mut Self
    where
        F: Fn() -> SharedConnector + Send + Sync + 'static,
    {
        self.factories
            .insert(scheme.to_ascii_lowercase(), Arc::new(factory));
        self
    }

    /// Whether a connector exists for `scheme`.
    pub fn supports(&self, scheme: &str) -> bool {
        let scheme = scheme.to_ascii_lowercase();
        self.factories.contains_key(&scheme) || Self::linked(&scheme).is_some()
    }

    /// Create a fresh connector for `scheme`, or `None` if no variant exists.
    pub fn create(&self, scheme: &str) -> Option<SharedConnector> {
        let scheme = scheme.to_ascii_lowercase();
        if let Some(factory) = self.factories.get(&scheme) {
            return Some(factory());
        }
        Self::linked(&scheme).map(|registration| (registration.factory)())
    }

    /// Schemes registered through `inventory`.
    pub fn linked_schemes() -> Vec<&'static str> {
        let mut schemes: Vec<_> = inventory::iter::<ConnectorRegistration>
            .into_iter()
            .map(|r| r.scheme)
            .collect();
        schemes.sort_unstable();
        schemes.dedup();
        schemes
    }

    fn linked(scheme: &str) -> Option<&'static ConnectorRegistration> {
        inventory::iter::<ConnectorRegistration>
            .into_iter()
            .find(|r| r.scheme.eq_ignore_ascii_case(scheme))
    }
}

impl fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<_> = self.factories.keys().collect();
        schemes.sort();
        f.debug_struct("ConnectorRegistry")
            .field("schemes", &schemes)
            .finish()
    }
}
