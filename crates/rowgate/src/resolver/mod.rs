//! Resource resolution.
//!
//! `Database.Table` -> DSN alias -> connection string -> cached connector,
//! and from there to a [`RecordProxy`] with a builder wired to the
//! connector's escaper.
//!
//! Resolution failures are logged (target `rowgate.resolve`) where they are
//! detected and returned to the caller.

pub mod mapping;
pub mod strategy;

pub use mapping::{DEFAULT_MAPPINGS_FILE, MAPPINGS_ENV, MappingSource, Mappings};
pub use strategy::ResolutionStrategy;

use crate::builder::{QueryKind, StatementBuilder};
use crate::connector::{ConnectionDescriptor, ConnectorRegistry, SharedConnector, lock};
use crate::error::{DaoError, DaoResult};
use crate::record::{RecordProxy, RecordRegistration};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cache entry for one connection string, filled by the first successful connect.
type ConnectorSlot = Arc<Mutex<Option<SharedConnector>>>;

/// Query kinds accepted by [`ResourceResolver::create_record`].
pub const RECORD_KINDS: [&str; 5] = ["select", "update", "insert", "delete", "info"];

/// Turns resource names into connected record handles.
///
/// Holds the connector cache: one connector per distinct connection string
/// (compared literally), created on first use and kept for the resolver's
/// lifetime. Share one resolver per process.
pub struct ResourceResolver {
    connectors: Mutex<HashMap<String, ConnectorSlot>>,
    registry: ConnectorRegistry,
    mappings: MappingSource,
    strategy: Option<Arc<dyn ResolutionStrategy>>,
}

impl ResourceResolver {
    pub fn new(mappings: MappingSource) -> Self {
        Self {
            connectors: Mutex::new(HashMap::new()),
            registry: ConnectorRegistry::new(),
            mappings,
            strategy: None,
        }
    }

    /// Resolver reading the mapping file named by `ROWGATE_MAPPINGS`.
    pub fn from_env() -> Self {
        Self::new(MappingSource::from_env())
    }

    /// Use `registry` for runtime connector factories.
    pub fn with_registry(mut self, registry: ConnectorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Send all lookups to `strategy`.
    pub fn with_strategy(mut self, strategy: Arc<dyn ResolutionStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ConnectorRegistry {
        &mut self.registry
    }

    pub fn mappings(&self) -> &MappingSource {
        &self.mappings
    }

    /// Number of cached connectors.
    pub fn cached_connectors(&self) -> usize {
        let slots: Vec<ConnectorSlot> = self.cache().values().cloned().collect();
        slots.iter().filter(|slot| lock_slot(slot).is_some()).count()
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, ConnectorSlot>> {
        self.connectors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connector for a connection string, connecting on first use.
    ///
    /// Each string has its own slot, locked across lookup, connect and fill:
    /// concurrent first resolutions of one string open a single connection,
    /// while other strings stay available.
    pub fn resolve_connector(&self, connection_string: &str) -> DaoResult<SharedConnector> {
        if connection_string.trim().is_empty() {
            return Err(warn_resolve(
                DaoError::EmptyInput("connection string"),
                "",
            ));
        }
        let subject = redact(connection_string);
        if let Some(strategy) = &self.strategy {
            return strategy
                .resolve_connector(connection_string)
                .map_err(|e| warn_resolve(e, &subject));
        }

        let descriptor = ConnectionDescriptor::parse(connection_string)
            .map_err(|e| warn_resolve(e, &subject))?;

        let slot = Arc::clone(
            self.cache()
                .entry(connection_string.to_string())
                .or_default(),
        );
        let mut cached = lock_slot(&slot);
        if let Some(connector) = cached.as_ref() {
            tracing::debug!(target: "rowgate.resolve", "connector cache hit");
            return Ok(Arc::clone(connector));
        }

        let connector = self.registry.create(descriptor.scheme()).ok_or_else(|| {
            warn_resolve(
                DaoError::ConnectorNotFound(descriptor.scheme().to_string()),
                &subject,
            )
        })?;

        {
            let mut guard = lock(&connector);
            if let Err(e) = guard.connect(&descriptor) {
                let detail = guard.last_error().cloned().unwrap_or(e);
                return Err(warn_resolve(
                    DaoError::ConnectFailed(detail),
                    &subject,
                ));
            }
        }

        tracing::info!(
            target: "rowgate.resolve",
            scheme = descriptor.scheme(),
            host = descriptor.host().unwrap_or(""),
            database = descriptor.database().unwrap_or(""),
            "connected"
        );
        *cached = Some(Arc::clone(&connector));
        Ok(connector)
    }

    /// Connector for a `database.table` resource: alias, then connection
    /// string, then [`resolve_connector`](Self::resolve_connector).
    ///
    /// The database is not selected; [`create_record`](Self::create_record) does that.
    pub fn connect(&self, resource: &str) -> DaoResult<SharedConnector> {
        let (database, _) = split_resource(resource)?;
        let alias = self.dsn_for_database(&database)?;
        let connection_string = self.connection_string_for(&alias)?;
        self.resolve_connector(&connection_string)
    }

    /// DSN alias for a database.
    pub fn dsn_for_database(&self, database: &str) -> DaoResult<String> {
        let found = match &self.strategy {
            Some(strategy) => strategy.alias_for(database),
            None => self
                .mappings
                .mappings()
                .and_then(|m| m.alias_for(database).map(str::to_string)),
        };
        found.map_err(|e| warn_resolve(e, database))
    }

    /// Connection string for a DSN alias.
    pub fn connection_string_for(&self, alias: &str) -> DaoResult<String> {
        let found = match &self.strategy {
            Some(strategy) => strategy.connection_string_for(alias),
            None => self
                .mappings
                .mappings()
                .and_then(|m| m.connection_string_for(alias).map(str::to_string)),
        };
        found.map_err(|e| warn_resolve(e, alias))
    }

    /// Connected record handle for `database.table`.
    ///
    /// `kind` is one of [`RECORD_KINDS`]. `info` gives a handle without a
    /// builder, for literal SQL through [`RecordProxy::query`].
    pub fn create_record(&self, resource: &str, kind: &str) -> DaoResult<RecordProxy> {
        let resource = resource.trim().to_ascii_lowercase();
        if resource.is_empty() {
            return Err(warn_resolve(DaoError::EmptyInput("resource"), ""));
        }

        let kind = match kind.trim().to_ascii_lowercase().as_str() {
            "info" => None,
            other => Some(other.parse::<QueryKind>().map_err(|_| {
                warn_resolve(
                    DaoError::InvalidQueryType(format!(
                        "'{other}' is not one of {}",
                        RECORD_KINDS.join(", ")
                    )),
                    &resource,
                )
            })?),
        };

        let (database, table) = split_resource(&resource)?;

        let mut record = match RecordRegistration::find(&resource) {
            Some(registration) => {
                let record = (registration.build)();
                if record.database() != database || record.table() != table {
                    return Err(warn_resolve(
                        DaoError::InvalidResourceType(format!(
                            "record registered for '{}' addresses '{}'",
                            registration.resource,
                            record.resource()
                        )),
                        &resource,
                    ));
                }
                record
            }
            None => RecordProxy::new(&database, &table),
        };

        let connector = self.connect(&resource)?;

        let escaper = {
            let mut guard = lock(&connector);
            if let Err(source) = guard.select_database(&database) {
                return Err(warn_resolve(
                    DaoError::DatabaseSelectFailed {
                        database: database.clone(),
                        source,
                    },
                    &resource,
                ));
            }
            guard.escaper()
        };
        record.set_connector(connector);

        if let Some(kind) = kind {
            let mut builder = StatementBuilder::with_escaper(escaper);
            builder.set_kind(kind)?.from(&table);
            record.set_statement_builder(builder);
        }

        tracing::debug!(target: "rowgate.resolve", resource = %resource, "record created");
        Ok(record)
    }

    /// `create_record(resource, "select")`
    pub fn select(&self, resource: &str) -> DaoResult<RecordProxy> {
        self.create_record(resource, "select")
    }
}

impl Default for ResourceResolver {
    fn default() -> Self {
        Self::new(MappingSource::default())
    }
}

impl fmt::Debug for ResourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceResolver")
            .field("cached_connectors", &self.cached_connectors())
            .field("registry", &self.registry)
            .field("mappings", &self.mappings)
            .field("strategy", &self.strategy.is_some())
            .finish()
    }
}

fn lock_slot(slot: &ConnectorSlot) -> MutexGuard<'_, Option<SharedConnector>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Split `database.table` (trimmed, lower-cased); both parts must be non-empty.
fn split_resource(resource: &str) -> DaoResult<(String, String)> {
    let resource = resource.trim().to_ascii_lowercase();
    match resource.split_once('.') {
        Some((database, table)) if !database.is_empty() && !table.is_empty() => {
            Ok((database.to_string(), table.to_string()))
        }
        _ => {
            if resource.is_empty() {
                return Err(warn_resolve(DaoError::EmptyInput("resource"), ""));
            }
            Err(warn_resolve(
                DaoError::MalformedResource(resource.clone()),
                &resource,
            ))
        }
    }
}

/// Connection string with any password masked, for logs.
fn redact(connection_string: &str) -> String {
    match url::Url::parse(connection_string) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => connection_string.to_string(),
    }
}

fn warn_resolve(err: DaoError, subject: &str) -> DaoError {
    tracing::warn!(target: "rowgate.resolve", subject, error = %err, "resolution failed");
    err
}

#[cfg(test)]
mod tests;
