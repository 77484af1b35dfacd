//! WHERE accumulation shared by SELECT, UPDATE and DELETE.

use crate::error::{DaoError, DaoResult};
use crate::escape::Escaper;
use crate::value::Value;

/// How a fragment joins the fragment before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// Comparison applied to a structured fragment's field.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// field = value
    Equals(Value),
    /// field IN (v1, v2, ...)
    In(Vec<Value>),
    /// field BETWEEN lo AND hi
    Between(Value, Value),
}

impl Predicate {
    /// Infer the predicate for a `by<Field>` argument.
    ///
    /// Without an explicit operator a scalar or one-element list is `=`, a
    /// longer list is `IN`. An explicit operator must be `IN` or `BETWEEN`
    /// (case-insensitive); a scalar given with one counts as a one-element list.
    pub fn infer(value: Value, operator: Option<&str>) -> DaoResult<Self> {
        let Some(op) = operator else {
            return Ok(match value {
                Value::List(mut items) if items.len() == 1 => Predicate::Equals(items.remove(0)),
                Value::List(items) => Predicate::In(items),
                scalar => Predicate::Equals(scalar),
            });
        };

        let items = match value {
            Value::List(items) => items,
            scalar => vec![scalar],
        };
        match op.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(Predicate::In(items)),
            "BETWEEN" => {
                let [lo, hi]: [Value; 2] = items
                    .try_into()
                    .map_err(|rest: Vec<Value>| DaoError::InvalidBetweenArity(rest.len()))?;
                Ok(Predicate::Between(lo, hi))
            }
            _ => Err(DaoError::InvalidOperator(op.to_string())),
        }
    }

    pub fn operator(&self) -> &'static str {
        match self {
            Predicate::Equals(_) => "=",
            Predicate::In(_) => "IN",
            Predicate::Between(..) => "BETWEEN",
        }
    }
}

/// One accumulated WHERE fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereFragment {
    /// Caller-supplied SQL, embedded verbatim.
    Raw(String),
    /// `{field, operator, value, conjunction}`, escaped at render time.
    Structured {
        field: String,
        predicate: Predicate,
        conjunction: Conjunction,
    },
}

impl WhereFragment {
    fn conjunction(&self) -> Conjunction {
        match self {
            WhereFragment::Raw(_) => Conjunction::And,
            WhereFragment::Structured { conjunction, .. } => *conjunction,
        }
    }

    fn render(&self, escaper: &dyn Escaper) -> String {
        match self {
            WhereFragment::Raw(sql) => sql.clone(),
            WhereFragment::Structured {
                field, predicate, ..
            } => {
                let field = escaper.escape_text(field);
                match predicate {
                    Predicate::Equals(v) => match escaper.escape(v) {
                        // `= NULL` never matches.
                        Value::Null => format!("{} IS NULL", field),
                        v => format!("{} = {}", field, v.to_literal()),
                    },
                    // Nothing can match an empty list.
                    Predicate::In(values) if values.is_empty() => "1=0".to_string(),
                    Predicate::In(values) => {
                        let rendered: Vec<String> = values
                            .iter()
                            .map(|v| escaper.escape(v).to_literal())
                            .collect();
                        format!("{} IN ({})", field, rendered.join(", "))
                    }
                    Predicate::Between(lo, hi) => format!(
                        "{} BETWEEN {} AND {}",
                        field,
                        escaper.escape(lo).to_literal(),
                        escaper.escape(hi).to_literal()
                    ),
                }
            }
        }
    }
}

/// Ordered WHERE fragments, raw and structured mixed in call order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClauses {
    fragments: Vec<WhereFragment>,
}

impl WhereClauses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn fragments(&self) -> &[WhereFragment] {
        &self.fragments
    }

    pub fn push_raw(&mut self, sql: &str) {
        self.fragments.push(WhereFragment::Raw(sql.to_string()));
    }

    pub fn push(&mut self, field: &str, predicate: Predicate, conjunction: Conjunction) {
        self.fragments.push(WhereFragment::Structured {
            field: field.to_ascii_lowercase(),
            predicate,
            conjunction,
        });
    }

    /// Build the WHERE clause string (without "WHERE" prefix).
    pub fn build_clause(&self, escaper: &dyn Escaper) -> String {
        let mut sql = String::new();
        for (i, fragment) in self.fragments.iter().enumerate() {
            if i > 0 {
                sql.push(' ');
                sql.push_str(fragment.conjunction().as_str());
                sql.push(' ');
            }
            sql.push_str(&fragment.render(escaper));
        }
        sql
    }
}
