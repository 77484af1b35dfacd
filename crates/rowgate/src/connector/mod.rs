//! Connector capability set.
//!
//! A connector owns one physical database handle. Resolution shares each
//! connector between every record handle bound to the same connection string,
//! so connectors are always held as [`SharedConnector`].

pub mod descriptor;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod registry;
pub mod result;

pub use descriptor::ConnectionDescriptor;
pub use memory::{MemoryConnector, MemoryJournal};
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnector;
pub use registry::{ConnectorFactory, ConnectorRegistration, ConnectorRegistry};
pub use result::{QueryOutcome, Reply, ResultOperation, ResultSet, Row};

use crate::escape::{Escaper, IdentityEscaper};
use crate::value::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Result type alias for connector operations
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// A connector shared between the resolver cache and record handles.
pub type SharedConnector = Arc<Mutex<dyn Connector>>;

/// Error detail reported by a connector (`code` is driver-specific, e.g. a SQLSTATE).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct ConnectorError {
    pub code: String,
    pub message: String,
}

impl ConnectorError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Error for an operation attempted before `connect`.
    pub fn not_connected() -> Self {
        Self::new("NOT_CONNECTED", "connector is not connected")
    }
}

/// Operations every database connector provides.
///
/// Result-set access is dynamic: [`Connector::invoke`] answers operations by
/// name and returns `None` for names the connector does not support, which
/// lets a record handle fall through to its statement builder.
pub trait Connector: Send {
    /// The URL scheme this connector serves.
    fn scheme(&self) -> &str;

    /// Open the underlying handle.
    fn connect(&mut self, descriptor: &ConnectionDescriptor) -> ConnectorResult<()>;

    /// Close the underlying handle.
    fn disconnect(&mut self) -> ConnectorResult<()>;

    /// Switch the active database.
    fn select_database(&mut self, name: &str) -> ConnectorResult<()>;

    /// Run one SQL statement. The result becomes the current result set.
    fn execute_query(&mut self, sql: &str) -> ConnectorResult<QueryOutcome>;

    /// Sanitizer handed to statement builders bound to this connector.
    fn escaper(&self) -> Arc<dyn Escaper> {
        Arc::new(IdentityEscaper)
    }

    /// The most recent failure, if any.
    fn last_error(&self) -> Option<&ConnectorError>;

    /// Rows produced by the last `execute_query`, if this connector keeps them.
    fn result_set(&mut self) -> Option<&mut ResultSet> {
        None
    }

    /// Answer a named operation, or `None` if unsupported.
    ///
    /// The default understands the [`ResultOperation`] names against
    /// [`Connector::result_set`].
    fn invoke(&mut self, operation: &str, args: &[Value]) -> Option<ConnectorResult<Reply>> {
        let op = ResultOperation::parse(operation)?;
        let result_set = self.result_set()?;
        Some(result_set.apply(op, args))
    }
}

/// Wrap a connector for sharing.
pub fn share<C: Connector + 'static>(connector: C) -> SharedConnector {
    Arc::new(Mutex::new(connector))
}

/// Lock a shared connector.
///
/// A panic while a connector was locked leaves its state no worse than the
/// last completed call, so poisoning is ignored.
pub fn lock(connector: &SharedConnector) -> MutexGuard<'_, dyn Connector + 'static> {
    connector.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Whether `sql` is an INSERT statement.
pub(crate) fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("insert"))
}
