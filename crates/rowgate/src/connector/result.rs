//! Result rows and the result-set operations reachable by name.

use super::{ConnectorError, ConnectorResult};
use crate::value::Value;
use std::collections::VecDeque;

/// One result row: column names and values in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.columns.push((name.to_string(), value.into()));
        self
    }

    /// Value of a column by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> &[(String, Value)] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Summary returned by `execute_query`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOutcome {
    /// Rows returned (reads) or affected (writes).
    pub row_count: u64,
}

/// Answer to a dynamically dispatched operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A clause operation was applied (`false` for a no-op such as `limit(0)`).
    Ack(bool),
    Row(Option<Row>),
    Rows(Vec<Row>),
    Count(u64),
    Field(Option<Value>),
    /// Key generated by the last INSERT, if the driver reported one.
    InsertId(Option<Value>),
}

/// Result-set operations understood by name.
///
/// Names are case-insensitive and ignore `_`, so `fetch_row`, `fetchRow` and
/// `fetchrow` are the same operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOperation {
    FetchRow,
    FetchAll,
    RowCount,
    FetchField,
    InsertId,
}

impl ResultOperation {
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "fetchrow" => Some(Self::FetchRow),
            "fetchall" | "fetchrowset" => Some(Self::FetchAll),
            "rowcount" | "affectedrows" | "numrows" => Some(Self::RowCount),
            "fetchfield" => Some(Self::FetchField),
            "insertid" | "lastinsertid" => Some(Self::InsertId),
            _ => None,
        }
    }
}

/// Rows from the last statement with a read cursor.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    rows: VecDeque<Row>,
    row_count: u64,
    insert_id: Option<Value>,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>, row_count: u64) -> Self {
        Self {
            rows: rows.into(),
            row_count,
            insert_id: None,
        }
    }

    /// Replace the current result. Clears the insert id.
    pub fn reset(&mut self, rows: Vec<Row>, row_count: u64) {
        *self = Self::new(rows, row_count);
    }

    /// Next unread row.
    pub fn fetch_row(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    /// All unread rows.
    pub fn fetch_all(&mut self) -> Vec<Row> {
        self.rows.drain(..).collect()
    }

    /// Rows returned or affected by the statement, independent of the cursor.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Record the key generated by the current statement.
    pub fn set_insert_id(&mut self, id: Option<Value>) {
        self.insert_id = id;
    }

    pub fn insert_id(&self) -> Option<&Value> {
        self.insert_id.as_ref()
    }

    /// Read the next row and return one of its columns.
    pub fn fetch_field(&mut self, name: &str) -> Option<Value> {
        self.fetch_row().and_then(|row| row.get(name).cloned())
    }

    pub fn apply(&mut self, op: ResultOperation, args: &[Value]) -> ConnectorResult<Reply> {
        Ok(match op {
            ResultOperation::FetchRow => Reply::Row(self.fetch_row()),
            ResultOperation::FetchAll => Reply::Rows(self.fetch_all()),
            ResultOperation::RowCount => Reply::Count(self.row_count()),
            ResultOperation::FetchField => {
                let name = args.first().ok_or_else(|| {
                    ConnectorError::new("ARGUMENT", "fetchfield expects a field name")
                })?;
                Reply::Field(self.fetch_field(&name.to_string()))
            }
            ResultOperation::InsertId => Reply::InsertId(self.insert_id.clone()),
        })
    }
}
