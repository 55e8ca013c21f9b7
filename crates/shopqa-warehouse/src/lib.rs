//! Warehouse sessions for the data-quality pipeline
//!
//! Every pipeline task talks to the warehouse through one [`Session`],
//! obtained from a [`Connector`] and released through a [`SessionGuard`]
//! on every exit path.
//!
//! ## Features
//!
//! Enable warehouse support via Cargo features:
//! - `snowflake` - Snowflake support
//! - `postgres` - PostgreSQL support
//! - `all-warehouses` - All warehouse backends
//!
//! ## Example
//!
//! ```rust,ignore
//! use shopqa_warehouse::{SnowflakeConnector, SessionGuard};
//!
//! let connector = SnowflakeConnector::new(settings);
//! let mut guard = SessionGuard::acquire(&connector).await?;
//! let outcome = guard.session().execute("CREATE SCHEMA IF NOT EXISTS raw").await;
//! guard.release(outcome).await?;
//! ```

pub mod session;
pub mod sql;
pub mod snowflake;
pub mod postgres;
pub mod mock;

pub use session::{Connector, Dialect, Session, SessionGuard, WarehouseError};
pub use sql::{QualifiedName, InsertBatch};
pub use snowflake::SnowflakeConnector;
pub use postgres::PostgresConnector;
pub use mock::{MockConnector, MockConnectorBuilder};

use shopqa_core::ConnectionSettings;

/// Build the connector matching a set of connection settings
pub fn connector_for(settings: ConnectionSettings) -> Box<dyn Connector> {
    match settings {
        ConnectionSettings::Snowflake(s) => Box::new(SnowflakeConnector::new(s)),
        ConnectionSettings::Postgres(p) => Box::new(PostgresConnector::new(p)),
    }
}
