//! In-process connector (`memory://`).
//!
//! Executes nothing. Every call is recorded in a [`MemoryJournal`] and results
//! are served from rows queued on that journal, which makes it the connector
//! used to exercise resolution and dispatch without a server.

use super::{
    ConnectionDescriptor, Connector, ConnectorError, ConnectorRegistration, ConnectorResult,
    QueryOutcome, ResultSet, Row, SharedConnector, is_insert, share,
};
use crate::escape::{Escaper, StandardEscaper};
use crate::value::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct JournalState {
    connects: usize,
    disconnects: usize,
    connection_strings: Vec<String>,
    databases: Vec<String>,
    statements: Vec<String>,
    queued: VecDeque<(Vec<Row>, Option<u64>)>,
    insert_ids: VecDeque<Value>,
    connect_failure: Option<ConnectorError>,
    query_failure: Option<ConnectorError>,
    rejected_databases: Vec<String>,
}

/// Shared record of what a [`MemoryConnector`] was asked to do.
///
/// Clones share state, so a test can keep one clone while the connector owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryJournal {
    state: Arc<Mutex<JournalState>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, JournalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connect_calls(&self) -> usize {
        self.state().connects
    }

    pub fn disconnect_calls(&self) -> usize {
        self.state().disconnects
    }

    /// Connection strings passed to `connect`, in order.
    pub fn connection_strings(&self) -> Vec<String> {
        self.state().connection_strings.clone()
    }

    /// Databases selected, in order.
    pub fn selected_databases(&self) -> Vec<String> {
        self.state().databases.clone()
    }

    /// Statements executed, in order.
    pub fn statements(&self) -> Vec<String> {
        self.state().statements.clone()
    }

    pub fn last_statement(&self) -> Option<String> {
        self.state().statements.last().cloned()
    }

    /// Queue rows for the next statement. Its row count is the number of rows.
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.state().queued.push_back((rows, None));
        self
    }

    /// Queue an affected-row count (no rows) for the next statement.
    pub fn push_affected(&self, count: u64) -> &Self {
        self.state().queued.push_back((Vec::new(), Some(count)));
        self
    }

    /// Queue the generated key reported by the next INSERT.
    pub fn push_insert_id(&self, id: impl Into<Value>) -> &Self {
        self.state().insert_ids.push_back(id.into());
        self
    }

    /// Make every `connect` fail with `error`.
    pub fn fail_connect(&self, error: ConnectorError) -> &Self {
        self.state().connect_failure = Some(error);
        self
    }

    /// Make the next `execute_query` fail with `error`.
    pub fn fail_next_query(&self, error: ConnectorError) -> &Self {
        self.state().query_failure = Some(error);
        self
    }

    /// Make `select_database(name)` fail.
    pub fn reject_database(&self, name: &str) -> &Self {
        self.state().rejected_databases.push(name.to_string());
        self
    }
}

/// Connector backed by a [`MemoryJournal`].
#[derive(Debug, Default)]
pub struct MemoryConnector {
    journal: MemoryJournal,
    descriptor: Option<ConnectionDescriptor>,
    database: Option<String>,
    result: ResultSet,
    last_error: Option<ConnectorError>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: MemoryJournal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn journal(&self) -> &MemoryJournal {
        &self.journal
    }

    pub fn is_connected(&self) -> bool {
        self.descriptor.is_some()
    }

    /// Currently selected database.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn fail<T>(&mut self, error: ConnectorError) -> ConnectorResult<T> {
        self.last_error = Some(error.clone());
        Err(error)
    }
}

impl Connector for MemoryConnector {
    fn scheme(&self) -> &str {
        "memory"
    }

    fn connect(&mut self, descriptor: &ConnectionDescriptor) -> ConnectorResult<()> {
        let failure = {
            let mut state = self.journal.state();
            state.connects += 1;
            state.connection_strings.push(descriptor.as_str().to_string());
            state.connect_failure.clone()
        };
        if let Some(error) = failure {
            return self.fail(error);
        }
        self.database = descriptor.database().map(str::to_string);
        self.descriptor = Some(descriptor.clone());
        Ok(())
    }

    fn disconnect(&mut self) -> ConnectorResult<()> {
        self.journal.state().disconnects += 1;
        self.descriptor = None;
        self.database = None;
        Ok(())
    }

    fn select_database(&mut self, name: &str) -> ConnectorResult<()> {
        if !self.is_connected() {
            return self.fail(ConnectorError::not_connected());
        }
        let rejected = {
            let mut state = self.journal.state();
            state.databases.push(name.to_string());
            state.rejected_databases.iter().any(|db| db == name)
        };
        if rejected {
            return self.fail(ConnectorError::new(
                "UNKNOWN_DATABASE",
                format!("unknown database '{name}'"),
            ));
        }
        self.database = Some(name.to_string());
        Ok(())
    }

    fn execute_query(&mut self, sql: &str) -> ConnectorResult<QueryOutcome> {
        if !self.is_connected() {
            return self.fail(ConnectorError::not_connected());
        }
        let insert = is_insert(sql);
        let (failure, queued, insert_id) = {
            let mut state = self.journal.state();
            state.statements.push(sql.to_string());
            match state.query_failure.take() {
                Some(error) => (Some(error), None, None),
                None => {
                    let insert_id = if insert {
                        state.insert_ids.pop_front()
                    } else {
                        None
                    };
                    (None, state.queued.pop_front(), insert_id)
                }
            }
        };
        if let Some(error) = failure {
            return self.fail(error);
        }

        let (rows, affected) = queued.unwrap_or_default();
        let row_count = affected.unwrap_or(rows.len() as u64);
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

fn new_memory_connector() -> SharedConnector {
    share(MemoryConnector::new())
}

inventory::submit! {
    ConnectorRegistration {
        scheme: "memory",
        factory: new_memory_connector,
    }
}
