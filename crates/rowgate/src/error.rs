//! Error types for rowgate

use crate::connector::ConnectorError;
use thiserror::Error;

/// Result type alias for rowgate operations
pub type DaoResult<T> = Result<T, DaoError>;

/// Which mapping table a lookup missed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingTable {
    /// database -> DSN alias
    Databases,
    /// DSN alias -> connection string
    Dsn,
}

impl std::fmt::Display for MappingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Databases => f.write_str("databases"),
            Self::Dsn => f.write_str("dsn"),
        }
    }
}

/// Error types for resolution, statement building and execution
#[derive(Debug, Error)]
pub enum DaoError {
    /// A required input was blank
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    /// Connection string carries no scheme
    #[error("No scheme in connection string '{0}'")]
    UnknownScheme(String),

    /// No connector variant is registered for a scheme
    #[error("No connector registered for scheme '{0}'")]
    ConnectorNotFound(String),

    /// The connector refused to connect
    #[error("Connect failed: {0}")]
    ConnectFailed(ConnectorError),

    /// Query kind outside the accepted set, or set twice
    #[error("Invalid query type: {0}")]
    InvalidQueryType(String),

    /// Registered record type does not serve the requested resource
    #[error("Invalid resource type: {0}")]
    InvalidResourceType(String),

    /// Resource name is not of the form `database.table`
    #[error("Malformed resource '{0}': expected 'database.table'")]
    MalformedResource(String),

    /// Mapping lookup miss
    #[error("No mapping found in [{table}] for '{key}'")]
    NoMappingFound { table: MappingTable, key: String },

    /// Mapping file exists but cannot be used
    #[error("Invalid mapping file: {0}")]
    InvalidMapping(String),

    /// Record handle has no connector bound
    #[error("No connector bound")]
    NoConnector,

    /// Record handle has neither a builder nor literal SQL
    #[error("No statement to execute")]
    NoStatement,

    /// Dynamic call matched nothing
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    /// Dynamic call was given too few arguments
    #[error("Missing argument for '{0}'")]
    MissingArgument(String),

    /// `build()` before a query kind was set
    #[error("No query type defined")]
    MissingQueryType,

    /// `build()` before a table was set
    #[error("No table defined")]
    MissingTable,

    /// INSERT/UPDATE rendered without any assignment
    #[error("No fields assigned for {0}")]
    MissingAssignments(&'static str),

    /// WHERE/LIMIT operation on an INSERT
    #[error("Invalid operation on an INSERT query: {0}")]
    InvalidForInsert(String),

    /// `set<Field>` on a query kind that takes no assignments
    #[error("Invalid operation on a {kind} query: {operation}")]
    InvalidForQueryType { kind: String, operation: String },

    /// BETWEEN with a value count other than two
    #[error("BETWEEN takes exactly 2 values, got {0}")]
    InvalidBetweenArity(usize),

    /// Explicit operator other than IN / BETWEEN
    #[error("Invalid WHERE operator '{0}': must be BETWEEN or IN")]
    InvalidOperator(String),

    /// The connector could not switch database
    #[error("Cannot select database '{database}': {source}")]
    DatabaseSelectFailed {
        database: String,
        source: ConnectorError,
    },

    /// Uniform failure surfaced by `RecordProxy::execute`
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Driver error outside connect / database selection
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),
}

impl DaoError {
    /// Create a mapping miss error
    pub fn no_mapping(table: MappingTable, key: impl Into<String>) -> Self {
        Self::NoMappingFound {
            table,
            key: key.into(),
        }
    }

    /// Create an operation-not-valid-for-kind error
    pub fn invalid_for_kind(kind: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::InvalidForQueryType {
            kind: kind.into(),
            operation: operation.into(),
        }
    }

    /// Check if this is a mapping miss
    pub fn is_no_mapping(&self) -> bool {
        matches!(self, Self::NoMappingFound { .. })
    }

    /// Check if this error came from resource or connector resolution
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput(_)
                | Self::UnknownScheme(_)
                | Self::ConnectorNotFound(_)
                | Self::ConnectFailed(_)
                | Self::InvalidResourceType(_)
                | Self::MalformedResource(_)
                | Self::NoMappingFound { .. }
                | Self::InvalidMapping(_)
                | Self::DatabaseSelectFailed { .. }
        )
    }

    /// Check if this error reports a malformed statement construction
    pub fn is_build_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidQueryType(_)
                | Self::UnknownOperation(_)
                | Self::MissingArgument(_)
                | Self::MissingQueryType
                | Self::MissingTable
                | Self::MissingAssignments(_)
                | Self::InvalidForInsert(_)
                | Self::InvalidForQueryType { .. }
                | Self::InvalidBetweenArity(_)
                | Self::InvalidOperator(_)
        )
    }
}
