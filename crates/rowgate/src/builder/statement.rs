use super::kind::QueryKind;
use super::operation::Operation;
use super::where_clause::{Conjunction, Predicate, WhereClauses};
use crate::error::{DaoError, DaoResult};
use crate::escape::{Escaper, IdentityEscaper};
use crate::value::Value;
use std::sync::Arc;

/// LIMIT state (`offset` 0 means none).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub count: i64,
    pub offset: i64,
}

/// Accumulates clause fragments for one statement and renders it.
///
/// Lifecycle: set the kind (once), set the table, accumulate clauses, then
/// [`build`](Self::build). Clause operations can be called directly or by name
/// through [`dispatch`](Self::dispatch).
pub struct StatementBuilder {
    /// Statement kind, set exactly once
    kind: Option<QueryKind>,
    /// Target table (lower-cased)
    table: Option<String>,
    /// SELECT field expressions, already escaped (empty means `*`)
    fields: Vec<String>,
    /// WHERE fragments
    where_clauses: WhereClauses,
    /// GROUP BY clause
    group: Option<String>,
    /// ORDER BY clause
    order: Option<String>,
    /// LIMIT
    limit: Option<Limit>,
    /// INSERT columns/values and UPDATE SET list, in first-assignment order
    assignments: Vec<(String, Value)>,
    escaper: Arc<dyn Escaper>,
}

impl std::fmt::Debug for StatementBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementBuilder")
            .field("kind", &self.kind)
            .field("table", &self.table)
            .field("fields", &self.fields)
            .field("where_clauses", &self.where_clauses)
            .field("group", &self.group)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("assignments", &self.assignments)
            .finish_non_exhaustive()
    }
}

impl Default for StatementBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementBuilder {
    /// Create a builder with the pass-through escaper.
    pub fn new() -> Self {
        Self::with_escaper(Arc::new(IdentityEscaper))
    }

    /// Create a builder that sanitizes through `escaper`.
    pub fn with_escaper(escaper: Arc<dyn Escaper>) -> Self {
        Self {
            kind: None,
            table: None,
            fields: Vec::new(),
            where_clauses: WhereClauses::new(),
            group: None,
            order: None,
            limit: None,
            assignments: Vec::new(),
            escaper,
        }
    }

    pub fn kind(&self) -> Option<QueryKind> {
        self.kind
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn selected_fields(&self) -> &[String] {
        &self.fields
    }

    pub fn where_clauses(&self) -> &WhereClauses {
        &self.where_clauses
    }

    pub fn assignments(&self) -> &[(String, Value)] {
        &self.assignments
    }

    pub fn limit_state(&self) -> Option<Limit> {
        self.limit
    }

    // ==================== Kind & table ====================

    /// Set the query kind from its name (case-insensitive).
    pub fn querytype(&mut self, kind: &str) -> DaoResult<&mut Self> {
        let kind: QueryKind = kind.parse()?;
        self.set_kind(kind)
    }

    /// Set the query kind. Fails if a kind is already set.
    pub fn set_kind(&mut self, kind: QueryKind) -> DaoResult<&mut Self> {
        if let Some(existing) = self.kind {
            return Err(DaoError::InvalidQueryType(format!(
                "query type already set to {existing}, cannot change to {kind}"
            )));
        }
        self.kind = Some(kind);
        Ok(self)
    }

    /// Set the target table (stored lower-cased).
    pub fn from(&mut self, table: &str) -> &mut Self {
        self.table = Some(table.trim().to_ascii_lowercase());
        self
    }

    // ==================== Columns ====================

    /// Set SELECT fields from one expression (e.g. `"id, COUNT(*) AS n"`).
    pub fn select(&mut self, fields: &str) -> &mut Self {
        self.fields = vec![self.escaper.escape_text(fields)];
        self
    }

    /// Set SELECT fields from a list of expressions.
    pub fn select_fields(&mut self, fields: &[&str]) -> &mut Self {
        self.fields = fields.iter().map(|f| self.escaper.escape_text(f)).collect();
        self
    }

    // ==================== Conditions ====================

    /// Append a raw WHERE fragment (without the `WHERE`).
    ///
    /// The fragment is embedded verbatim; the caller must ensure safety.
    /// Fails on INSERT.
    pub fn where_raw(&mut self, clause: &str) -> DaoResult<&mut Self> {
        if self.kind == Some(QueryKind::Insert) {
            return Err(DaoError::InvalidForInsert("where".to_string()));
        }
        if !clause.trim().is_empty() {
            self.where_clauses.push_raw(clause);
        }
        Ok(self)
    }

    /// The `by<Field>` operation: append a structured fragment joined with AND.
    ///
    /// `operator` may force `IN` or `BETWEEN`; see [`Predicate::infer`].
    pub fn by(
        &mut self,
        field: &str,
        value: impl Into<Value>,
        operator: Option<&str>,
    ) -> DaoResult<&mut Self> {
        self.push_filter(field, value.into(), operator, Conjunction::And)
    }

    /// Like [`by`](Self::by), joined with OR.
    pub fn or_by(
        &mut self,
        field: &str,
        value: impl Into<Value>,
        operator: Option<&str>,
    ) -> DaoResult<&mut Self> {
        self.push_filter(field, value.into(), operator, Conjunction::Or)
    }

    /// Add `field = value`.
    pub fn where_equals(&mut self, field: &str, value: impl Into<Value>) -> DaoResult<&mut Self> {
        self.ensure_filterable(field)?;
        self.where_clauses
            .push(field, Predicate::Equals(value.into()), Conjunction::And);
        Ok(self)
    }

    /// Add `field IN (...)`.
    pub fn where_in<I, T>(&mut self, field: &str, values: I) -> DaoResult<&mut Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.ensure_filterable(field)?;
        let values = values.into_iter().map(Into::into).collect();
        self.where_clauses
            .push(field, Predicate::In(values), Conjunction::And);
        Ok(self)
    }

    /// Add `field BETWEEN lo AND hi`.
    pub fn where_between(
        &mut self,
        field: &str,
        lo: impl Into<Value>,
        hi: impl Into<Value>,
    ) -> DaoResult<&mut Self> {
        self.ensure_filterable(field)?;
        self.where_clauses.push(
            field,
            Predicate::Between(lo.into(), hi.into()),
            Conjunction::And,
        );
        Ok(self)
    }

    fn push_filter(
        &mut self,
        field: &str,
        value: Value,
        operator: Option<&str>,
        conjunction: Conjunction,
    ) -> DaoResult<&mut Self> {
        self.ensure_filterable(field)?;
        let predicate = Predicate::infer(value, operator)?;
        self.where_clauses.push(field, predicate, conjunction);
        Ok(self)
    }

    fn ensure_filterable(&self, field: &str) -> DaoResult<()> {
        if self.kind == Some(QueryKind::Insert) {
            return Err(DaoError::InvalidForInsert(format!("by{field}")));
        }
        Ok(())
    }

    // ==================== Assignments ====================

    /// The `set<Field>` operation: record `field = value` for INSERT/UPDATE.
    ///
    /// A repeated field keeps its original position and takes the new value.
    /// Values are interpolated verbatim at build time (not escaped).
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> DaoResult<&mut Self> {
        match self.kind {
            Some(kind) if kind.takes_assignments() => {}
            other => {
                return Err(DaoError::invalid_for_kind(
                    other.map_or("untyped", |k| k.as_str()),
                    format!("set{field}"),
                ));
            }
        }

        let field = field.to_ascii_lowercase();
        let value = value.into();
        match self.assignments.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = value,
            None => self.assignments.push((field, value)),
        }
        Ok(self)
    }

    // ==================== Ordering & pagination ====================

    /// Set the ORDER BY clause, verbatim.
    pub fn order(&mut self, clause: &str) -> &mut Self {
        self.order = Some(clause.to_string());
        self
    }

    /// Set the GROUP BY clause, verbatim.
    pub fn group(&mut self, clause: &str) -> &mut Self {
        self.group = Some(clause.to_string());
        self
    }

    /// Set LIMIT (with `offset` > 0, `LIMIT offset, count`).
    ///
    /// Returns `Ok(false)` and leaves state untouched when `count` is not
    /// positive. Fails on INSERT.
    pub fn limit(&mut self, count: i64, offset: i64) -> DaoResult<bool> {
        if self.kind == Some(QueryKind::Insert) {
            return Err(DaoError::InvalidForInsert("limit".to_string()));
        }
        if count <= 0 {
            return Ok(false);
        }
        self.limit = Some(Limit {
            count,
            offset: offset.max(0),
        });
        Ok(true)
    }

    // ==================== Dynamic protocol ====================

    /// Apply an operation by name.
    ///
    /// Explicit operations (`querytype`, `from`, `select`, `where`, `order`,
    /// `group`, `limit`) take their usual arguments; `by<Field>(value,
    /// [operator])` and `set<Field>(value)` follow the naming convention.
    /// Returns `Ok(false)` only for a `limit` no-op.
    pub fn dispatch(&mut self, name: &str, args: &[Value]) -> DaoResult<bool> {
        let op =
            Operation::parse(name).ok_or_else(|| DaoError::UnknownOperation(name.to_string()))?;

        match op {
            Operation::QueryType => {
                self.querytype(&text_arg(name, args, 0)?)?;
            }
            Operation::From => {
                self.from(&text_arg(name, args, 0)?);
            }
            Operation::Select => match arg(name, args, 0)? {
                Value::List(items) => {
                    let fields: Vec<String> = items.iter().map(ToString::to_string).collect();
                    let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
                    self.select_fields(&refs);
                }
                other => {
                    self.select(&other.to_string());
                }
            },
            Operation::Where => {
                self.where_raw(&text_arg(name, args, 0)?)?;
            }
            Operation::Order => {
                self.order(&text_arg(name, args, 0)?);
            }
            Operation::Group => {
                self.group(&text_arg(name, args, 0)?);
            }
            Operation::Limit => {
                let count = int_arg(name, args, 0)?;
                let offset = match args.get(1) {
                    Some(v) => int_of(name, v)?,
                    None => 0,
                };
                return self.limit(count, offset);
            }
            Operation::By(field) => {
                let value = arg(name, args, 0)?.clone();
                let operator = args.get(1).map(ToString::to_string);
                self.by(&field, value, operator.as_deref())?;
            }
            Operation::Set(field) => {
                let value = arg(name, args, 0)?.clone();
                self.set(&field, value)?;
            }
        }
        Ok(true)
    }

    // ==================== SQL build ====================

    /// Render the accumulated statement.
    pub fn build(&self) -> DaoResult<String> {
        let kind = self.kind.ok_or(DaoError::MissingQueryType)?;
        let table = self
            .table
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(DaoError::MissingTable)?;

        let sql = match kind {
            QueryKind::Select => {
                let fields = if self.fields.is_empty() {
                    "*".to_string()
                } else {
                    self.fields.join(", ")
                };
                let mut sql = format!("SELECT {} FROM {}", fields, table);
                self.push_where(&mut sql);
                if let Some(ref group) = self.group {
                    sql.push_str(" GROUP BY ");
                    sql.push_str(group);
                }
                if let Some(ref order) = self.order {
                    sql.push_str(" ORDER BY ");
                    sql.push_str(order);
                }
                self.push_limit(&mut sql);
                sql
            }
            QueryKind::Update => {
                if self.assignments.is_empty() {
                    return Err(DaoError::MissingAssignments("UPDATE"));
                }
                let set_parts: Vec<String> = self
                    .assignments
                    .iter()
                    .map(|(field, value)| format!("{}={}", field, assignment_literal(value)))
                    .collect();
                let mut sql = format!("UPDATE {} SET {}", table, set_parts.join(", "));
                self.push_where(&mut sql);
                self.push_limit(&mut sql);
                sql
            }
            QueryKind::Insert => {
                if self.assignments.is_empty() {
                    return Err(DaoError::MissingAssignments("INSERT"));
                }
                let columns: Vec<&str> = self.assignments.iter().map(|(f, _)| f.as_str()).collect();
                let values: Vec<String> = self
                    .assignments
                    .iter()
                    .map(|(_, v)| assignment_literal(v))
                    .collect();
                format!(
                    "INSERT INTO {}({}) VALUES ({})",
                    table,
                    columns.join(","),
                    values.join(",")
                )
            }
            QueryKind::Delete => {
                let mut sql = format!("DELETE FROM {}", table);
                self.push_where(&mut sql);
                self.push_limit(&mut sql);
                sql
            }
        };

        Ok(sql)
    }

    fn push_where(&self, sql: &mut String) {
        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.build_clause(self.escaper.as_ref()));
        }
    }

    fn push_limit(&self, sql: &mut String) {
        match self.limit {
            Some(Limit { count, offset }) if offset > 0 => {
                sql.push_str(&format!(" LIMIT {}, {}", offset, count));
            }
            Some(Limit { count, .. }) => {
                sql.push_str(&format!(" LIMIT {}", count));
            }
            None => {}
        }
    }
}

/// Assignment values are quoted verbatim; `NULL` stays a keyword.
fn assignment_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        other => format!("'{}'", other),
    }
}

fn arg<'a>(name: &str, args: &'a [Value], idx: usize) -> DaoResult<&'a Value> {
    args.get(idx)
        .ok_or_else(|| DaoError::MissingArgument(name.to_string()))
}

fn text_arg(name: &str, args: &[Value], idx: usize) -> DaoResult<String> {
    Ok(arg(name, args, idx)?.to_string())
}

fn int_arg(name: &str, args: &[Value], idx: usize) -> DaoResult<i64> {
    int_of(name, arg(name, args, idx)?)
}

fn int_of(name: &str, value: &Value) -> DaoResult<i64> {
    value
        .as_i64()
        .ok_or_else(|| DaoError::MissingArgument(format!("{name}: expected an integer, got {value:?}")))
}
