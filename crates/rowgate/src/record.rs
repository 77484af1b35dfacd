//! Record handles.
//!
//! A [`RecordProxy`] addresses one `database.table` resource. It holds a shared
//! connector, at most one statement builder and the last SQL it ran. Calls the
//! proxy does not define itself go through [`RecordProxy::call`]: the connector
//! gets the first chance to answer (result-set access), then the builder
//! (clause accumulation).
//!
//! ```ignore
//! let mut users = resolver.create_record("Shop.Users", "select")?;
//! users.call("byStatus", &["active".into()])?;
//! users.call("limit", &[10.into()])?;
//! users.execute()?;
//! while let Some(row) = users.fetch_row()? {
//!     println!("{:?}", row.get("name"));
//! }
//! ```

use crate::builder::StatementBuilder;
use crate::connector::{QueryOutcome, Reply, Row, SharedConnector, lock};
use crate::error::{DaoError, DaoResult};
use crate::value::Value;
use std::fmt;

/// Handler for a record-specific operation.
pub type RecordOperation = fn(&mut RecordProxy, &[Value]) -> DaoResult<Reply>;

/// Resource-specific record type, discovered at link time.
///
/// When `ResourceResolver::create_record` resolves a resource that has a
/// registration, it starts from `build()` instead of a generic proxy. The
/// proxy returned must address the registered resource.
pub struct RecordRegistration {
    /// `database.table`, lowercase.
    pub resource: &'static str,
    pub build: fn() -> RecordProxy,
}

inventory::collect!(RecordRegistration);

impl RecordRegistration {
    /// Find the registration for a (lowercase) resource name.
    pub fn find(resource: &str) -> Option<&'static RecordRegistration> {
        inventory::iter::<RecordRegistration>
            .into_iter()
            .find(|r| r.resource.eq_ignore_ascii_case(resource))
    }
}

/// Register a resource-specific record constructor.
///
/// ```ignore
/// fn orders() -> RecordProxy {
///     RecordProxy::new("shop", "orders").with_operation("open", |record, _| {
///         record.builder_mut()?.where_equals("status", "open")?;
///         Ok(Reply::Ack(true))
///     })
/// }
/// rowgate::register_record!("shop.orders", orders);
/// ```
#[macro_export]
macro_rules! register_record {
    ($resource:literal, $build:path) => {
        $crate::inventory::submit! {
            $crate::record::RecordRegistration {
                resource: $resource,
                build: $build,
            }
        }
    };
}

/// Handle for reading and writing one table.
pub struct RecordProxy {
    database: String,
    table: String,
    connector: Option<SharedConnector>,
    builder: Option<StatementBuilder>,
    sql: Option<String>,
    operations: Vec<(String, RecordOperation)>,
}

impl RecordProxy {
    pub fn new(database: &str, table: &str) -> Self {
        Self {
            database: database.trim().to_ascii_lowercase(),
            table: table.trim().to_ascii_lowercase(),
            connector: None,
            builder: None,
            sql: None,
            operations: Vec::new(),
        }
    }

    /// Add a record-specific operation, answered before the connector and builder.
    pub fn with_operation(mut self, name: &str, operation: RecordOperation) -> Self {
        self.operations.push((name.to_ascii_lowercase(), operation));
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `database.table`
    pub fn resource(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }

    /// Bind a connector. The trait bound is the capability check.
    pub fn set_connector(&mut self, connector: SharedConnector) -> &mut Self {
        self.connector = Some(connector);
        self
    }

    pub fn connector(&self) -> Option<&SharedConnector> {
        self.connector.as_ref()
    }

    /// Attach a builder, replacing any previous one.
    pub fn set_statement_builder(&mut self, builder: StatementBuilder) -> &mut Self {
        self.builder = Some(builder);
        self
    }

    pub fn builder(&self) -> Option<&StatementBuilder> {
        self.builder.as_ref()
    }

    /// The bound builder, for typed clause calls.
    pub fn builder_mut(&mut self) -> DaoResult<&mut StatementBuilder> {
        self.builder.as_mut().ok_or(DaoError::NoStatement)
    }

    /// Store literal SQL for `execute`. A bound builder still takes precedence.
    pub fn query(&mut self, sql: &str) -> DaoResult<()> {
        if sql.trim().is_empty() {
            return Err(DaoError::EmptyInput("sql"));
        }
        self.sql = Some(sql.to_string());
        Ok(())
    }

    /// The last SQL executed, or stored with `query`.
    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    /// Build (or take the stored SQL) and run it on the connector.
    ///
    /// Builder errors are reported as `ExecutionFailed`, as are driver errors.
    pub fn execute(&mut self) -> DaoResult<QueryOutcome> {
        let Some(connector) = self.connector.clone() else {
            return Err(DaoError::NoConnector);
        };

        if let Some(builder) = &self.builder {
            let sql = builder
                .build()
                .map_err(|e| DaoError::ExecutionFailed(e.to_string()))?;
            self.sql = Some(sql);
        }
        let Some(sql) = self.sql.as_deref() else {
            return Err(DaoError::NoStatement);
        };

        tracing::debug!(
            target: "rowgate.sql",
            resource = %self.resource(),
            kind = self.builder.as_ref().and_then(|b| b.kind()).map(|k| k.as_str()).unwrap_or("RAW"),
            sql = %truncate_sql(sql, 200),
            "execute"
        );

        let mut guard = lock(&connector);
        guard.execute_query(sql).map_err(|e| {
            tracing::warn!(target: "rowgate.sql", resource = %self.resource(), error = %e, "statement failed");
            DaoError::ExecutionFailed(e.to_string())
        })
    }

    /// Dispatch an operation by name.
    ///
    /// Order: record-specific operations, then the connector (`fetch_row`,
    /// `row_count`, ...), then the builder (`by<Field>`, `set<Field>`, `limit`, ...).
    pub fn call(&mut self, name: &str, args: &[Value]) -> DaoResult<Reply> {
        let lowered = name.to_ascii_lowercase();
        let own = self
            .operations
            .iter()
            .find(|(op, _)| *op == lowered)
            .map(|(_, op)| *op);
        if let Some(operation) = own {
            return operation(self, args);
        }

        if let Some(connector) = &self.connector {
            if let Some(reply) = lock(connector).invoke(name, args) {
                return Ok(reply?);
            }
        }

        match self.builder.as_mut() {
            Some(builder) => builder.dispatch(name, args).map(Reply::Ack),
            None => Err(DaoError::UnknownOperation(name.to_string())),
        }
    }

    /// Next row of the last result.
    pub fn fetch_row(&mut self) -> DaoResult<Option<Row>> {
        match self.call("fetchrow", &[])? {
            Reply::Row(row) => Ok(row),
            _ => Err(DaoError::UnknownOperation("fetchrow".to_string())),
        }
    }

    /// Remaining rows of the last result.
    pub fn fetch_all(&mut self) -> DaoResult<Vec<Row>> {
        match self.call("fetchall", &[])? {
            Reply::Rows(rows) => Ok(rows),
            _ => Err(DaoError::UnknownOperation("fetchall".to_string())),
        }
    }

    /// Rows returned or affected by the last statement.
    pub fn row_count(&mut self) -> DaoResult<u64> {
        match self.call("rowcount", &[])? {
            Reply::Count(n) => Ok(n),
            _ => Err(DaoError::UnknownOperation("rowcount".to_string())),
        }
    }

    /// Key generated by the last INSERT, when the connector reports one.
    pub fn insert_id(&mut self) -> DaoResult<Option<Value>> {
        match self.call("insertid", &[])? {
            Reply::InsertId(id) => Ok(id),
            _ => Err(DaoError::UnknownOperation("insertid".to_string())),
        }
    }
}

impl fmt::Debug for RecordProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordProxy")
            .field("database", &self.database)
            .field("table", &self.table)
            .field("connected", &self.connector.is_some())
            .field("builder", &self.builder)
            .field("sql", &self.sql)
            .field(
                "operations",
                &self.operations.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn truncate_sql(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
