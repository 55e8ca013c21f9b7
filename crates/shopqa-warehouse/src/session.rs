//! Connector/session traits and scoped session ownership

use shopqa_core::Row;

/// SQL dialect spoken by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Snowflake,
    Postgres,
}

impl Dialect {
    /// Query returning the server version as its only column
    pub fn version_query(&self) -> &'static str {
        match self {
            Self::Snowflake => "SELECT CURRENT_VERSION()",
            Self::Postgres => "SELECT version()",
        }
    }

    /// Whether `CREATE DATABASE IF NOT EXISTS` / `USE DATABASE` are available
    pub fn supports_database_ddl(&self) -> bool {
        matches!(self, Self::Snowflake)
    }
}

/// Errors that can occur while talking to the warehouse
#[derive(Debug, Clone, thiserror::Error)]
pub enum WarehouseError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WarehouseError {
    /// Connection-level failures (as opposed to a bad statement)
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::AuthenticationError(_) | Self::ConnectionError(_))
    }
}

/// Opens warehouse sessions
///
/// Connectors are cheap, shareable descriptions of where to connect;
/// each task opens its own session from one.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Backend name (e.g., "Snowflake", "PostgreSQL")
    fn name(&self) -> &'static str;

    /// SQL dialect of the sessions this connector opens
    fn dialect(&self) -> Dialect;

    /// Open a new session
    async fn connect(&self) -> Result<Box<dyn Session>, WarehouseError>;
}

/// A single warehouse connection/cursor pair
#[async_trait::async_trait]
pub trait Session: Send {
    /// Run a statement, returning the affected row count when the backend reports one
    async fn execute(&mut self, sql: &str) -> Result<u64, WarehouseError>;

    /// Run a query and return its first row, if any
    async fn query_first(&mut self, sql: &str) -> Result<Option<Row>, WarehouseError>;

    /// Release the connection; calling it twice is a no-op
    async fn close(&mut self) -> Result<(), WarehouseError>;
}

/// Owns one session for the duration of a task
///
/// The guard must be finished with [`SessionGuard::release`], which closes
/// the session whatever the outcome of the work done with it. A guard that
/// is dropped without being released logs a warning.
pub struct SessionGuard {
    session: Box<dyn Session>,
    backend: &'static str,
    released: bool,
}

impl SessionGuard {
    /// Open a session from `connector`
    pub async fn acquire(connector: &dyn Connector) -> Result<Self, WarehouseError> {
        let session = connector.connect().await?;
        tracing::debug!(backend = connector.name(), "warehouse session opened");
        Ok(Self {
            session,
            backend: connector.name(),
            released: false,
        })
    }

    /// The guarded session
    pub fn session(&mut self) -> &mut dyn Session {
        self.session.as_mut()
    }

    /// Close the session, then hand back `outcome`
    ///
    /// A failed close turns a successful outcome into an error; when the
    /// outcome is already an error the close failure is only logged, so the
    /// original error is the one that propagates.
    pub async fn release<T, E>(mut self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<WarehouseError>,
    {
        let closed = self.session.close().await;
        self.released = true;
        tracing::debug!(backend = self.backend, "warehouse session closed");

        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(E::from(e)),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!(backend = self.backend, error = %close_err, "failed to close session after error");
                Err(e)
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(backend = self.backend, "warehouse session dropped without being released");
        }
    }
}
