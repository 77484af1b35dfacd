//! Connection-string parsing.
//!
//! Format: `scheme://[user[:pass]@]host[:port]/[database|path]`.

use super::ConnectorError;
use crate::error::{DaoError, DaoResult};
use url::{ParseError, Url};

/// Parsed connection string. The scheme selects the connector variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    raw: String,
    scheme: String,
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
}

impl ConnectionDescriptor {
    /// Parse a connection string. Fails with `UnknownScheme` when there is no scheme.
    pub fn parse(connection_string: &str) -> DaoResult<Self> {
        let raw = connection_string.trim();
        if raw.is_empty() {
            return Err(DaoError::EmptyInput("connection string"));
        }

        let url = Url::parse(raw).map_err(|e| match e {
            ParseError::RelativeUrlWithoutBase => DaoError::UnknownScheme(raw.to_string()),
            other => DaoError::ConnectFailed(ConnectorError::new("INVALID_URL", other.to_string())),
        })?;
        if url.scheme().is_empty() {
            return Err(DaoError::UnknownScheme(raw.to_string()));
        }

        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Ok(Self {
            raw: raw.to_string(),
            scheme: url.scheme().to_ascii_lowercase(),
            host: url.host_str().and_then(non_empty),
            port: url.port(),
            user: non_empty(url.username()),
            password: url.password().and_then(non_empty),
            database: non_empty(url.path().trim_matches('/')),
        })
    }

    /// The connection string exactly as given (trimmed).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Database name (or path) from the URL path.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}
