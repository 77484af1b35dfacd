//! PostgreSQL connector (`postgres://`, `postgresql://`).
//!
//! Drives `tokio-postgres` from a private current-thread runtime so the
//! connector stays synchronous. Statements go through the simple query
//! protocol, so every column comes back as text. PostgreSQL has no in-session
//! database switch; `select_database` reconnects with a new `dbname`.
//!
//! The insert id is the first column of the first row an INSERT returns, so
//! ask for it with `RETURNING id`.

use super::{
    ConnectionDescriptor, Connector, ConnectorError, ConnectorRegistration, ConnectorResult,
    QueryOutcome, ResultSet, Row, SharedConnector, is_insert, share,
};
use crate::escape::{Escaper, StandardEscaper};
use crate::value::Value;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage};

#[derive(Default)]
pub struct PostgresConnector {
    runtime: Option<Runtime>,
    client: Option<Client>,
    config: Option<Config>,
    result: ResultSet,
    last_error: Option<ConnectorError>,
}

impl PostgresConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|c| !c.is_closed())
    }

    /// Database named in the active configuration.
    pub fn database(&self) -> Option<&str> {
        self.config.as_ref().and_then(|c| c.get_dbname())
    }

    fn fail<T>(&mut self, error: ConnectorError) -> ConnectorResult<T> {
        self.last_error = Some(error.clone());
        Err(error)
    }

    fn open(&mut self, config: Config) -> ConnectorResult<()> {
        if self.runtime.is_none() {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| ConnectorError::new("RUNTIME", e.to_string()))?;
            self.runtime = Some(runtime);
        }
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(ConnectorError::new("RUNTIME", "runtime unavailable"));
        };

        let (client, connection) = runtime
            .block_on(config.connect(NoTls))
            .map_err(pg_error)?;
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(target: "rowgate.sql", error = %e, "postgres connection closed");
            }
        });

        self.client = Some(client);
        self.config = Some(config);
        Ok(())
    }
}

impl Connector for PostgresConnector {
    fn scheme(&self) -> &str {
        "postgres"
    }

    fn connect(&mut self, descriptor: &ConnectionDescriptor) -> ConnectorResult<()> {
        let config = match descriptor.as_str().parse::<Config>() {
            Ok(config) => config,
            Err(e) => return self.fail(pg_error(e)),
        };
        match self.open(config) {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    fn disconnect(&mut self) -> ConnectorResult<()> {
        self.client = None;
        Ok(())
    }

    fn select_database(&mut self, name: &str) -> ConnectorResult<()> {
        let Some(config) = self.config.clone() else {
            return self.fail(ConnectorError::not_connected());
        };
        if config.get_dbname() == Some(name) && self.is_connected() {
            return Ok(());
        }

        let mut config = config;
        config.dbname(name);
        self.client = None;
        match self.open(config) {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    fn execute_query(&mut self, sql: &str) -> ConnectorResult<QueryOutcome> {
        let (Some(runtime), Some(client)) = (self.runtime.as_ref(), self.client.as_ref()) else {
            return self.fail(ConnectorError::not_connected());
        };

        let messages = match runtime.block_on(client.simple_query(sql)) {
            Ok(messages) => messages,
            Err(e) => return self.fail(pg_error(e)),
        };

        let mut rows = Vec::new();
        let mut row_count = 0;
        for message in messages {
            match message {
                SimpleQueryMessage::Row(row) => {
                    rows.push(
                        row.columns()
                            .iter()
                            .enumerate()
                            .map(|(i, column)| {
                                let value = row.get(i).map_or(Value::Null, Value::text);
                                (column.name().to_string(), value)
                            })
                            .collect::<Row>(),
                    );
                }
                SimpleQueryMessage::CommandComplete(n) => row_count = n,
                _ => {}
            }
        }

        // PostgreSQL reports generated keys only through `INSERT ... RETURNING`.
        let insert_id = if is_insert(sql) {
            rows.first()
                .and_then(|row| row.columns().first())
                .map(|(_, value)| value.clone())
        } else {
            None
        };
        self.result.reset(rows, row_count);
        self.result.set_insert_id(insert_id);
        self.last_error = None;
        Ok(QueryOutcome { row_count })
    }

    fn escaper(&self) -> Arc<dyn Escaper> {
        Arc::new(StandardEscaper)
    }

    fn last_error(&self) -> Option<&ConnectorError> {
        self.last_error.as_ref()
    }

    fn result_set(&mut self) -> Option<&mut ResultSet> {
        Some(&mut self.result)
    }
}

/// Map a driver error, keeping the SQLSTATE when the server sent one.
fn pg_error(err: tokio_postgres::Error) -> ConnectorError {
    let code = err
        .as_db_error()
        .map(|db| db.code().code().to_string())
        .unwrap_or_else(|| "CONNECTION".to_string());
    ConnectorError::new(code, err.to_string())
}

fn new_postgres_connector() -> SharedConnector {
    share(PostgresConnector::new())
}

inventory::submit! {
    ConnectorRegistration {
        scheme: "postgres",
        factory: new_postgres_connector,
    }
}

inventory::submit! {
    ConnectorRegistration {
        scheme: "postgresql",
        factory: new_postgres_connector,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_connect() {
        let mut connector = PostgresConnector::new();
        assert!(!connector.is_connected());
        assert_eq!(
            connector.execute_query("SELECT 1").unwrap_err(),
            ConnectorError::not_connected()
        );
        assert!(connector.select_database("app").is_err());
        assert!(connector.last_error().is_some());
    }

    #[test]
    fn invalid_connection_string() {
        let mut connector = PostgresConnector::new();
        let descriptor = ConnectionDescriptor::parse("postgres://localhost/app?sslmode=bogus").unwrap();
        assert!(connector.connect(&descriptor).is_err());
    }
}
