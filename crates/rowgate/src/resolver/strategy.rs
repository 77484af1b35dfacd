use crate::connector::SharedConnector;
use crate::error::DaoResult;

/// Replacement for the resolver's lookups.
///
/// A resolver built with a strategy sends every connector resolution and
/// alias lookup to it and never touches its own cache, registry or mapping
/// tables. Tests use this to hand out prepared connectors.
pub trait ResolutionStrategy: Send + Sync {
    fn resolve_connector(&self, connection_string: &str) -> DaoResult<SharedConnector>;

    /// database -> DSN alias
    fn alias_for(&self, database: &str) -> DaoResult<String>;

    /// DSN alias -> connection string
    fn connection_string_for(&self, alias: &str) -> DaoResult<String>;
}
