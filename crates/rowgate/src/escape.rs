//! Value sanitization hooks injected into the statement builder.
//!
//! The builder is **not** injection-safe on its own. Its escaper is applied to
//! SELECT field expressions and to every value of a structured WHERE fragment;
//! INSERT/UPDATE assignment values are interpolated verbatim, and raw
//! `where`/`order`/`group` strings are never touched.

use crate::value::Value;

/// Sanitizes values before they are embedded in SQL text.
///
/// Implementors provide [`Escaper::escape_text`]; [`Escaper::escape`] applies
/// it uniformly across value shapes: lists element-wise, booleans to `0`/`1`,
/// null stays null (rendered as the literal `NULL`).
pub trait Escaper: Send + Sync {
    /// Escape a text fragment.
    fn escape_text(&self, text: &str) -> String;

    /// Escape any value.
    fn escape(&self, value: &Value) -> Value {
        match value {
            Value::Text(s) => Value::Text(self.escape_text(s)),
            Value::Bool(b) => Value::Int(i64::from(*b)),
            Value::List(items) => Value::List(items.iter().map(|v| self.escape(v)).collect()),
            other => other.clone(),
        }
    }
}

/// Pass-through escaper; the default when no connector supplies one.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityEscaper;

impl Escaper for IdentityEscaper {
    fn escape_text(&self, text: &str) -> String {
        text.to_string()
    }

    fn escape(&self, value: &Value) -> Value {
        value.clone()
    }
}

/// Standard SQL string escaping: doubles single quotes and drops NUL bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEscaper;

impl Escaper for StandardEscaper {
    fn escape_text(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\0' => {}
                c => out.push(c),
            }
        }
        out
    }
}
