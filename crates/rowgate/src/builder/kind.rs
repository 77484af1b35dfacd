use crate::error::DaoError;
use std::fmt;
use std::str::FromStr;

/// The four statement kinds a builder can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Select => "SELECT",
            QueryKind::Insert => "INSERT",
            QueryKind::Update => "UPDATE",
            QueryKind::Delete => "DELETE",
        }
    }

    /// Whether `set<Field>` assignments are legal.
    pub fn takes_assignments(&self) -> bool {
        matches!(self, QueryKind::Insert | QueryKind::Update)
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryKind {
    type Err = DaoError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SELECT" => Ok(QueryKind::Select),
            "INSERT" => Ok(QueryKind::Insert),
            "UPDATE" => Ok(QueryKind::Update),
            "DELETE" => Ok(QueryKind::Delete),
            _ => Err(DaoError::InvalidQueryType(format!(
                "unknown query type '{}', expected one of SELECT, INSERT, UPDATE, DELETE",
                s.trim()
            ))),
        }
    }
}
