//! Statement builder.
//!
//! Accumulates clause fragments for one SELECT/INSERT/UPDATE/DELETE and
//! renders it as a single SQL string.
//!
//! ## Design
//!
//! - Typed fluent methods (`where_equals`, `where_in`, `set`, ...) are the
//!   primary API.
//! - The same state is reachable by operation name (`byStatus`, `setName`,
//!   `limit`, ...) through [`StatementBuilder::dispatch`], which parses the
//!   name into an [`Operation`] instead of reflecting on methods.
//! - Values in structured WHERE fragments and SELECT fields pass through the
//!   injected [`Escaper`](crate::escape::Escaper); nothing else does.

pub mod kind;
pub mod operation;
pub mod statement;
pub mod where_clause;

pub use kind::QueryKind;
pub use operation::Operation;
pub use statement::{Limit, StatementBuilder};
pub use where_clause::{Conjunction, Predicate, WhereClauses, WhereFragment};
