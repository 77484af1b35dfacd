//! Common imports.
//!
//! ```ignore
//! use rowgate::prelude::*;
//! ```

pub use crate::{
    DaoError, DaoResult, MappingSource, Mappings, QueryKind, RecordProxy, Reply, ResourceResolver,
    Row, StatementBuilder, Value,
};
pub use crate::connector::{Connector, SharedConnector};
