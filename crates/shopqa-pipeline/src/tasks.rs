//! Warehouse-facing tasks
//!
//! Each function opens one session through a [`SessionGuard`] and releases
//! it before returning, on success and on failure alike.

use crate::PipelineError;
use shopqa_core::QualityCheckResult;
use shopqa_datagen::{CUSTOMERS_FILE, EVENTS_FILE, ORDERS_FILE};
use shopqa_quality::{run_checks, write_quality_report};
use shopqa_transform::DbtStep;
use shopqa_warehouse::sql::{create_varchar_table, validate_identifier};
use shopqa_warehouse::{Connector, InsertBatch, QualifiedName, Session, SessionGuard};
use std::path::Path;

/// One node of the pipeline graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    InitWarehouse,
    IngestCustomers,
    IngestOrders,
    IngestEvents,
    Dbt(DbtStep),
    ValidateQuality,
    AlertOnIssues,
    GenerateQualityReport,
}

impl Task {
    pub const INGEST: [Task; 3] = [Task::IngestCustomers, Task::IngestOrders, Task::IngestEvents];

    pub fn id(&self) -> String {
        match self {
            Self::InitWarehouse => "init_warehouse".to_string(),
            Self::IngestCustomers => "ingest_customers".to_string(),
            Self::IngestOrders => "ingest_orders".to_string(),
            Self::IngestEvents => "ingest_events".to_string(),
            Self::Dbt(step) => step.task_id().to_string(),
            Self::ValidateQuality => "validate_quality".to_string(),
            Self::AlertOnIssues => "alert_on_issues".to_string(),
            Self::GenerateQualityReport => "generate_quality_report".to_string(),
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "init_warehouse" => Some(Self::InitWarehouse),
            "ingest_customers" => Some(Self::IngestCustomers),
            "ingest_orders" => Some(Self::IngestOrders),
            "ingest_events" => Some(Self::IngestEvents),
            "validate_quality" => Some(Self::ValidateQuality),
            "alert_on_issues" => Some(Self::AlertOnIssues),
            "generate_quality_report" => Some(Self::GenerateQualityReport),
            other => DbtStep::from_task_id(other).map(Self::Dbt),
        }
    }

    /// Raw table and source file of an ingest task
    pub fn ingest_source(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::IngestCustomers => Some(("raw.customers", CUSTOMERS_FILE)),
            Self::IngestOrders => Some(("raw.orders", ORDERS_FILE)),
            Self::IngestEvents => Some(("raw.events", EVENTS_FILE)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

pub const SCHEMAS: [&str; 3] = ["raw", "staging", "mart"];

/// Typed raw tables; ingestion only appends to them
pub const RAW_TABLE_DDL: [&str; 3] = [
    "\
CREATE TABLE IF NOT EXISTS raw.customers (
    customer_id VARCHAR(20),
    email VARCHAR(255),
    first_name VARCHAR(100),
    last_name VARCHAR(100),
    date_of_birth DATE,
    country VARCHAR(2),
    city VARCHAR(100),
    signup_date TIMESTAMP,
    customer_segment VARCHAR(20),
    _loaded_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)",
    "\
CREATE TABLE IF NOT EXISTS raw.orders (
    order_id VARCHAR(20),
    customer_id VARCHAR(20),
    order_date TIMESTAMP,
    order_status VARCHAR(20),
    total_amount DECIMAL(10,2),
    payment_method VARCHAR(50),
    shipping_cost DECIMAL(10,2),
    discount_amount DECIMAL(10,2),
    _loaded_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)",
    "\
CREATE TABLE IF NOT EXISTS raw.events (
    event_id VARCHAR(20),
    customer_id VARCHAR(20),
    event_type VARCHAR(50),
    event_timestamp TIMESTAMP,
    page_url VARCHAR(500),
    product_id VARCHAR(20),
    session_id VARCHAR(50),
    device_type VARCHAR(20),
    _loaded_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)",
];

/// Verify connectivity and create the database objects the pipeline needs
///
/// `database` is only used by dialects with database-level DDL. Returns the
/// server version reported by the probe.
pub async fn init_warehouse(connector: &dyn Connector, database: Option<&str>) -> Result<String, PipelineError> {
    let mut guard = SessionGuard::acquire(connector).await?;
    let outcome = init_statements(guard.session(), connector, database).await;
    guard.release(outcome).await
}

async fn init_statements(
    session: &mut dyn Session,
    connector: &dyn Connector,
    database: Option<&str>,
) -> Result<String, PipelineError> {
    let dialect = connector.dialect();
    let version = session
        .query_first(dialect.version_query())
        .await?
        .and_then(|row| row.values.into_iter().next())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    tracing::info!(backend = connector.name(), %version, "warehouse connection verified");

    if dialect.supports_database_ddl() {
        if let Some(database) = database {
            let database = validate_identifier(database)?;
            session
                .execute(&format!("CREATE DATABASE IF NOT EXISTS {}", database))
                .await?;
            session.execute(&format!("USE DATABASE {}", database)).await?;
            tracing::info!(database, "database created/verified");
        }
    }

    for schema in SCHEMAS {
        session
            .execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
            .await?;
    }
    for ddl in RAW_TABLE_DDL {
        session.execute(ddl).await?;
    }
    tracing::info!(schemas = ?SCHEMAS, "schemas and raw tables created/verified");

    Ok(version)
}

/// Append the rows of a CSV file to `table`
///
/// The table is created with one VARCHAR column per header when missing.
/// Empty cells are loaded as NULL. Returns the number of rows loaded.
/// The file is parsed on the blocking pool before a session is opened.
pub async fn ingest_csv(
    connector: &dyn Connector,
    table: &QualifiedName,
    path: &Path,
    batch_size: usize,
) -> Result<u64, PipelineError> {
    let owned = path.to_path_buf();
    let (columns, rows) = tokio::task::spawn_blocking(move || read_csv(&owned)).await??;

    let mut guard = SessionGuard::acquire(connector).await?;
    let outcome = load_rows(guard.session(), connector, table, &columns, &rows, batch_size).await;
    let loaded = guard.release(outcome).await?;

    tracing::info!("Loaded {} rows into {}", loaded, table);
    Ok(loaded)
}

fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<Option<String>>>), PipelineError> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect(),
        );
    }
    Ok((columns, rows))
}

async fn load_rows(
    session: &mut dyn Session,
    connector: &dyn Connector,
    table: &QualifiedName,
    columns: &[String],
    rows: &[Vec<Option<String>>],
    batch_size: usize,
) -> Result<u64, PipelineError> {
    session.execute(&create_varchar_table(table, columns)?).await?;

    let mut loaded = 0u64;
    for chunk in rows.chunks(batch_size.max(1)) {
        let batch = InsertBatch::build(connector.dialect(), table, columns, chunk)?;
        session.execute(&batch.sql).await?;
        loaded += batch.rows as u64;
        tracing::debug!(%table, rows = batch.rows, "batch inserted");
    }
    Ok(loaded)
}

/// Run the staging checks on one session
pub async fn validate_quality(connector: &dyn Connector) -> Result<QualityCheckResult, PipelineError> {
    let mut guard = SessionGuard::acquire(connector).await?;
    let outcome = run_checks(guard.session()).await.map_err(PipelineError::from);
    guard.release(outcome).await
}

/// Append this run's row to `mart.data_quality_report`
pub async fn generate_quality_report(connector: &dyn Connector, pipeline_name: &str) -> Result<(), PipelineError> {
    let mut guard = SessionGuard::acquire(connector).await?;
    let outcome = write_quality_report(guard.session(), connector.dialect(), pipeline_name)
        .await
        .map_err(PipelineError::from);
    guard.release(outcome).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shopqa_warehouse::{Dialect, MockConnector};
    use std::io::Write;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn task_ids_round_trip() {
        for task in [
            Task::InitWarehouse,
            Task::IngestEvents,
            Task::Dbt(DbtStep::TestMart),
            Task::GenerateQualityReport,
        ] {
            assert_eq!(Task::from_id(&task.id()), Some(task));
        }
        assert_eq!(Task::from_id("backfill"), None);
    }

    #[tokio::test]
    async fn init_creates_database_schemas_and_tables() {
        let connector = MockConnector::new();
        let version = init_warehouse(&connector, Some("ECOMMERCE_DWH")).await.unwrap();
        assert_eq!(version, "mock-1.0");

        let statements = connector.statements().await;
        assert_eq!(statements[0], "SELECT CURRENT_VERSION()");
        assert_eq!(statements[1], "CREATE DATABASE IF NOT EXISTS ECOMMERCE_DWH");
        assert_eq!(statements[2], "USE DATABASE ECOMMERCE_DWH");
        assert_eq!(connector.statements_matching("CREATE SCHEMA IF NOT EXISTS").await.len(), 3);
        assert_eq!(connector.statements_matching("CREATE TABLE IF NOT EXISTS raw.").await.len(), 3);
        assert_eq!(connector.sessions_closed().await, 1);
    }

    #[tokio::test]
    async fn postgres_init_skips_database_ddl() {
        let connector = MockConnector::builder().with_dialect(Dialect::Postgres).build();
        init_warehouse(&connector, Some("ECOMMERCE_DWH")).await.unwrap();
        assert!(connector.statements_matching("DATABASE").await.is_empty());
    }

    #[tokio::test]
    async fn failed_ddl_fails_init_and_closes_the_session() {
        let connector = MockConnector::new();
        connector.fail_statements_matching("CREATE SCHEMA IF NOT EXISTS staging").await;

        let err = init_warehouse(&connector, None).await.unwrap_err();
        assert!(matches!(err, PipelineError::Warehouse(_)));
        assert_eq!(connector.sessions_closed().await, 1);
        assert!(connector.statements_matching("raw.customers").await.is_empty());
    }

    #[tokio::test]
    async fn ingest_batches_rows_and_loads_empty_cells_as_null() {
        let file = csv_file("customer_id,email\nCUST000001,a@example.com\nCUST000002,\nCUST000003,o'neil@example.com\n");
        let connector = MockConnector::new();
        let table = QualifiedName::parse("raw.customers").unwrap();

        let loaded = ingest_csv(&connector, &table, file.path(), 2).await.unwrap();
        assert_eq!(loaded, 3);

        let statements = connector.statements().await;
        assert_eq!(
            statements[0],
            "CREATE TABLE IF NOT EXISTS raw.customers (customer_id VARCHAR, email VARCHAR)"
        );
        let inserts = connector.statements_matching("INSERT INTO raw.customers").await;
        assert_eq!(inserts.len(), 2);
        assert!(inserts[0].contains("('CUST000002', NULL)"));
        assert!(inserts[1].contains("'o''neil@example.com'"));
        assert_eq!(connector.sessions_closed().await, 1);
    }

    #[tokio::test]
    async fn ingest_failure_still_closes_the_session() {
        let file = csv_file("order_id\nORD00000001\n");
        let connector = MockConnector::new();
        connector.fail_statements_matching("INSERT INTO").await;
        let table = QualifiedName::parse("raw.orders").unwrap();

        assert!(ingest_csv(&connector, &table, file.path(), 500).await.is_err());
        assert_eq!(connector.sessions_opened().await, 1);
        assert_eq!(connector.sessions_closed().await, 1);
    }

    #[tokio::test]
    async fn missing_file_opens_no_session() {
        let connector = MockConnector::new();
        let table = QualifiedName::parse("raw.events").unwrap();

        let err = ingest_csv(&connector, &table, Path::new("/nonexistent/events.csv"), 500)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Csv(_)));
        assert_eq!(connector.sessions_opened().await, 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn concurrent_ingests_share_one_runtime_thread() {
        let customers = csv_file("customer_id\nCUST000001\nCUST000002\n");
        let orders = csv_file("order_id\nORD00000001\n");
        let events = csv_file("event_id\nEVT0000000001\nEVT0000000002\nEVT0000000003\n");
        let connector = MockConnector::new();

        let targets = [
            ("raw.customers", customers.path()),
            ("raw.orders", orders.path()),
            ("raw.events", events.path()),
        ];
        let loads = targets.iter().map(|(name, path)| {
            let connector = &connector;
            async move {
                let table = QualifiedName::parse(name)?;
                ingest_csv(connector, &table, path, 500).await
            }
        });
        let loaded: Vec<u64> = futures::future::join_all(loads)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(loaded, vec![2, 1, 3]);
        assert_eq!(connector.sessions_closed().await, 3);
    }
}
