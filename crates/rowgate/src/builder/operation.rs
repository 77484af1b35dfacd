//! Operation-name parser for the dynamic clause protocol.
//!
//! Names are matched case-insensitively. Explicit builder operations win over
//! the prefixes, so `select` is never read as `set` + `lect`.

/// A parsed dynamic operation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    QueryType,
    From,
    Select,
    Where,
    Order,
    Group,
    Limit,
    /// `by<Field>`: structured WHERE fragment on `Field`
    By(String),
    /// `set<Field>`: assignment to `Field`
    Set(String),
}

impl Operation {
    /// Parse an operation name. Returns `None` when nothing matches.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let op = match lower.as_str() {
            "querytype" | "query_type" => Operation::QueryType,
            "from" => Operation::From,
            "select" => Operation::Select,
            "where" => Operation::Where,
            "order" | "order_by" => Operation::Order,
            "group" | "group_by" => Operation::Group,
            "limit" => Operation::Limit,
            _ => {
                if let Some(field) = field_after(&lower, "by") {
                    Operation::By(field)
                } else if let Some(field) = field_after(&lower, "set") {
                    Operation::Set(field)
                } else {
                    return None;
                }
            }
        };
        Some(op)
    }
}

/// The field name following `prefix`, with one optional `_` separator
/// (`byStatus`, `by_status`).
fn field_after(name: &str, prefix: &str) -> Option<String> {
    let rest = name.strip_prefix(prefix)?;
    let rest = rest.strip_prefix('_').unwrap_or(rest);
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_fields() {
        assert_eq!(
            Operation::parse("byStatus"),
            Some(Operation::By("status".into()))
        );
        assert_eq!(
            Operation::parse("set_UserName"),
            Some(Operation::Set("username".into()))
        );
    }

    #[test]
    fn explicit_names_take_precedence() {
        assert_eq!(Operation::parse("SELECT"), Some(Operation::Select));
        assert_eq!(Operation::parse("querytype"), Some(Operation::QueryType));
    }

    #[test]
    fn bare_prefix_is_unknown() {
        assert_eq!(Operation::parse("by"), None);
        assert_eq!(Operation::parse("set_"), None);
        assert_eq!(Operation::parse("frobnicate"), None);
    }
}
