//! In-memory warehouse for testing
//!
//! [`MockConnector`] hands out sessions that record every statement they
//! receive and answer queries from scripted rows. It never touches a
//! network and is what the pipeline, quality and CLI tests run against.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shopqa_warehouse::MockConnector;
//! use shopqa_core::{Row, SqlValue};
//!
//! let connector = MockConnector::new();
//! connector
//!     .respond_to("FROM staging.stg_orders", Row::from_pairs([("TOTAL_ORDERS", SqlValue::Int(10))]))
//!     .await;
//!
//! let mut session = connector.connect().await?;
//! let row = session.query_first("SELECT COUNT(*) AS total_orders FROM staging.stg_orders").await?;
//! ```
//!
//! ## Simulating Failures
//!
//! ```rust,ignore
//! // Every connect fails
//! let connector = MockConnector::builder().with_connection_failure().build();
//!
//! // The first two connects fail, later ones succeed
//! let connector = MockConnector::builder().with_failing_connects(2).build();
//!
//! // Statements containing "stg_orders" fail
//! connector.fail_statements_matching("stg_orders").await;
//! ```

use crate::session::{Connector, Dialect, Session, WarehouseError};
use shopqa_core::Row;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MockState {
    /// Every statement executed or queried, in arrival order
    statements: Vec<String>,

    /// Scripted answers: first pattern contained in the SQL wins
    responses: Vec<(String, Row)>,

    /// Statements containing any of these fail with a query error
    failing: Vec<String>,

    fail_connection: bool,

    /// Connect attempts still due to fail
    failing_connects: u32,

    fail_close: bool,

    opened: usize,
    closed: usize,
}

/// Connector producing in-memory sessions
///
/// Clones share state, so a test can keep one handle for assertions while
/// the code under test owns another.
#[derive(Clone)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
    dialect: Dialect,
    latency_ms: u64,
}

impl MockConnector {
    /// A connector with no scripted responses that speaks the Snowflake dialect
    pub fn new() -> Self {
        MockConnectorBuilder::new().build()
    }

    pub fn builder() -> MockConnectorBuilder {
        MockConnectorBuilder::new()
    }

    /// Answer queries containing `pattern` with `row`
    pub async fn respond_to(&self, pattern: impl Into<String>, row: Row) {
        self.state.lock().await.responses.push((pattern.into(), row));
    }

    /// Fail every statement containing `pattern`
    pub async fn fail_statements_matching(&self, pattern: impl Into<String>) {
        self.state.lock().await.failing.push(pattern.into());
    }

    /// Stop failing statements
    pub async fn clear_failures(&self) {
        self.state.lock().await.failing.clear();
    }

    /// All statements received so far
    pub async fn statements(&self) -> Vec<String> {
        self.state.lock().await.statements.clone()
    }

    /// Statements containing `pattern`
    pub async fn statements_matching(&self, pattern: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .statements
            .iter()
            .filter(|s| s.contains(pattern))
            .cloned()
            .collect()
    }

    pub async fn sessions_opened(&self) -> usize {
        self.state.lock().await.opened
    }

    pub async fn sessions_closed(&self) -> usize {
        self.state.lock().await.closed
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    fn name(&self) -> &'static str {
        "Mock"
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn connect(&self) -> Result<Box<dyn Session>, WarehouseError> {
        self.simulate_latency().await;

        let mut state = self.state.lock().await;
        if state.fail_connection {
            return Err(WarehouseError::ConnectionError(
                "Simulated connection failure".to_string(),
            ));
        }
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(WarehouseError::ConnectionError(
                "Simulated transient connection failure".to_string(),
            ));
        }
        state.opened += 1;

        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
            dialect: self.dialect,
            closed: false,
        }))
    }
}

struct MockSession {
    state: Arc<Mutex<MockState>>,
    dialect: Dialect,
    closed: bool,
}

impl MockSession {
    /// Record `sql` and return the scripted answer for it
    async fn record(&self, sql: &str) -> Result<Option<Row>, WarehouseError> {
        if self.closed {
            return Err(WarehouseError::ConnectionError("session already closed".to_string()));
        }

        let mut state = self.state.lock().await;
        state.statements.push(sql.to_string());

        if let Some(pattern) = state.failing.iter().find(|p| sql.contains(p.as_str())) {
            return Err(WarehouseError::QueryError(format!(
                "Simulated failure for statement matching '{}'",
                pattern
            )));
        }

        if let Some((_, row)) = state.responses.iter().find(|(p, _)| sql.contains(p.as_str())) {
            return Ok(Some(row.clone()));
        }

        // Version probes always answer, so connectivity checks pass by default
        if sql == self.dialect.version_query() {
            return Ok(Some(Row::from_pairs([(
                "VERSION",
                shopqa_core::SqlValue::Text("mock-1.0".to_string()),
            )])));
        }

        Ok(None)
    }
}

#[async_trait::async_trait]
impl Session for MockSession {
    async fn execute(&mut self, sql: &str) -> Result<u64, WarehouseError> {
        self.record(sql).await?;
        Ok(0)
    }

    async fn query_first(&mut self, sql: &str) -> Result<Option<Row>, WarehouseError> {
        self.record(sql).await
    }

    async fn close(&mut self) -> Result<(), WarehouseError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut state = self.state.lock().await;
        state.closed += 1;
        if state.fail_close {
            return Err(WarehouseError::ConnectionError(
                "Simulated close failure".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for a [`MockConnector`]
///
/// # Example
///
/// ```rust,ignore
/// let connector = MockConnector::builder()
///     .with_dialect(Dialect::Postgres)
///     .with_response("stg_customers", row)
///     .with_latency(20)
///     .build();
/// ```
pub struct MockConnectorBuilder {
    state: MockState,
    dialect: Dialect,
    latency_ms: u64,
}

impl MockConnectorBuilder {
    pub fn new() -> Self {
        Self {
            state: MockState::default(),
            dialect: Dialect::Snowflake,
            latency_ms: 0,
        }
    }

    /// Speak `dialect` instead of Snowflake
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Answer queries containing `pattern` with `row`
    pub fn with_response(mut self, pattern: impl Into<String>, row: Row) -> Self {
        self.state.responses.push((pattern.into(), row));
        self
    }

    /// Fail statements containing `pattern`
    pub fn with_failing_statement(mut self, pattern: impl Into<String>) -> Self {
        self.state.failing.push(pattern.into());
        self
    }

    /// Fail every connect
    pub fn with_connection_failure(mut self) -> Self {
        self.state.fail_connection = true;
        self
    }

    /// Fail the first `count` connects
    pub fn with_failing_connects(mut self, count: u32) -> Self {
        self.state.failing_connects = count;
        self
    }

    /// Fail every session close
    pub fn with_close_failure(mut self) -> Self {
        self.state.fail_close = true;
        self
    }

    /// Delay every connect by `latency_ms`
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn build(self) -> MockConnector {
        MockConnector {
            state: Arc::new(Mutex::new(self.state)),
            dialect: self.dialect,
            latency_ms: self.latency_ms,
        }
    }
}

impl Default for MockConnectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopqa_core::SqlValue;

    #[tokio::test]
    async fn records_statements_in_order() {
        let connector = MockConnector::new();
        let mut session = connector.connect().await.unwrap();
        session.execute("CREATE SCHEMA IF NOT EXISTS raw").await.unwrap();
        session.execute("CREATE SCHEMA IF NOT EXISTS staging").await.unwrap();

        assert_eq!(
            connector.statements().await,
            vec![
                "CREATE SCHEMA IF NOT EXISTS raw".to_string(),
                "CREATE SCHEMA IF NOT EXISTS staging".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn scripted_responses_match_by_substring() {
        let connector = MockConnector::new();
        connector
            .respond_to("stg_orders", Row::from_pairs([("TOTAL_ORDERS", SqlValue::Int(7))]))
            .await;

        let mut session = connector.connect().await.unwrap();
        let row = session
            .query_first("SELECT COUNT(*) FROM staging.stg_orders")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.get("total_orders"), Some(&SqlValue::Int(7)));

        let none = session.query_first("SELECT 1 FROM elsewhere").await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn version_probe_answers_by_default() {
        let connector = MockConnector::builder().with_dialect(Dialect::Postgres).build();
        let mut session = connector.connect().await.unwrap();
        let row = session.query_first("SELECT version()").await.unwrap();
        assert!(row.is_some());
    }

    #[tokio::test]
    async fn connection_failures() {
        let connector = MockConnector::builder().with_connection_failure().build();
        let err = connector.connect().await.err().unwrap();
        assert!(err.is_connection());

        let flaky = MockConnector::builder().with_failing_connects(1).build();
        assert!(flaky.connect().await.is_err());
        assert!(flaky.connect().await.is_ok());
        assert_eq!(flaky.sessions_opened().await, 1);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let connector = MockConnector::new();
        let mut session = connector.connect().await.unwrap();
        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(connector.sessions_closed().await, 1);

        assert!(session.execute("SELECT 1").await.is_err());
    }
}
