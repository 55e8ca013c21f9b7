//! PostgreSQL sessions
//!
//! Works with any PostgreSQL-compatible server reachable through a
//! connection URL (`SHOPQA_POSTGRES_URL`). Statements run through the
//! simple query protocol, so every value comes back as text and is typed
//! with [`SqlValue::from_text`].
//!
//! TLS is used when the URL asks for it (`sslmode=require`).
//!
//! Reference: https://www.postgresql.org/docs/current/protocol-flow.html#PROTOCOL-FLOW-SIMPLE-QUERY

use crate::session::{Connector, Dialect, Session, WarehouseError};
use shopqa_core::PostgresSettings;

#[cfg(feature = "postgres")]
use shopqa_core::{Row, SqlValue};

#[cfg(feature = "postgres")]
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

#[cfg(feature = "postgres")]
use postgres_native_tls::MakeTlsConnector;

#[cfg(feature = "postgres")]
use native_tls::TlsConnector;

/// Opens PostgreSQL sessions from a connection URL
#[derive(Clone)]
pub struct PostgresConnector {
    settings: PostgresSettings,
}

impl PostgresConnector {
    pub fn new(settings: PostgresSettings) -> Self {
        Self { settings }
    }

    /// Whether the connection URL requires TLS
    pub fn requires_tls(&self) -> bool {
        self.settings.url.contains("sslmode=require")
    }
}

impl std::fmt::Debug for PostgresConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnector")
            .field("tls", &self.requires_tls())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Connector for PostgresConnector {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    #[cfg(feature = "postgres")]
    async fn connect(&self) -> Result<Box<dyn Session>, WarehouseError> {
        let url = &self.settings.url;

        let (client, handle) = if self.requires_tls() {
            let connector = TlsConnector::builder()
                .build()
                .map_err(|e| WarehouseError::ConfigError(format!("Failed to create TLS connector: {}", e)))?;
            let (client, connection) = tokio_postgres::connect(url, MakeTlsConnector::new(connector))
                .await
                .map_err(|e| WarehouseError::AuthenticationError(format!(
                    "Failed to connect to PostgreSQL with TLS: {}", e
                )))?;
            let handle = tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "PostgreSQL TLS connection error");
                }
            });
            (client, handle)
        } else {
            let (client, connection) = tokio_postgres::connect(url, NoTls)
                .await
                .map_err(|e| WarehouseError::AuthenticationError(format!(
                    "Failed to connect to PostgreSQL: {}", e
                )))?;
            let handle = tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "PostgreSQL connection error");
                }
            });
            (client, handle)
        };

        Ok(Box::new(PostgresSession {
            client: Some(client),
            connection: Some(handle),
        }))
    }

    #[cfg(not(feature = "postgres"))]
    async fn connect(&self) -> Result<Box<dyn Session>, WarehouseError> {
        Err(WarehouseError::ConfigError(
            "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres".to_string()
        ))
    }
}

/// One PostgreSQL connection plus its background driver task
#[cfg(feature = "postgres")]
pub struct PostgresSession {
    client: Option<Client>,
    connection: Option<tokio::task::JoinHandle<()>>,
}

#[cfg(feature = "postgres")]
impl PostgresSession {
    async fn simple_query(&self, sql: &str) -> Result<Vec<SimpleQueryMessage>, WarehouseError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| WarehouseError::ConnectionError("session already closed".to_string()))?;

        client.simple_query(sql).await.map_err(|e| {
            if e.is_closed() {
                WarehouseError::ConnectionError(e.to_string())
            } else {
                WarehouseError::QueryError(e.to_string())
            }
        })
    }
}

#[cfg(feature = "postgres")]
#[async_trait::async_trait]
impl Session for PostgresSession {
    async fn execute(&mut self, sql: &str) -> Result<u64, WarehouseError> {
        let messages = self.simple_query(sql).await?;
        Ok(messages
            .iter()
            .map(|m| match m {
                SimpleQueryMessage::CommandComplete(n) => *n,
                _ => 0,
            })
            .sum())
    }

    async fn query_first(&mut self, sql: &str) -> Result<Option<Row>, WarehouseError> {
        let messages = self.simple_query(sql).await?;
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                let values = (0..row.len())
                    .map(|i| SqlValue::from_text(row.get(i)))
                    .collect();
                return Ok(Some(Row::new(columns, values)));
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<(), WarehouseError> {
        // Dropping the client ends the connection; the driver task then finishes
        self.client.take();
        if let Some(handle) = self.connection.take() {
            handle
                .await
                .map_err(|e| WarehouseError::ConnectionError(format!("Connection task failed: {}", e)))?;
        }
        Ok(())
    }
}
