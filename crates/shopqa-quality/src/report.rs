//! Per-run quality report row in `mart.data_quality_report`
//!
//! The table is created once and each run appends one row, so the table
//! keeps the history of runs.

use crate::QualityError;
use shopqa_warehouse::sql::literal;
use shopqa_warehouse::{Dialect, Session};

pub const REPORT_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS mart.data_quality_report (
    report_timestamp TIMESTAMP,
    pipeline_name VARCHAR,
    customers_count BIGINT,
    orders_count BIGINT,
    events_count BIGINT,
    avg_order_quality DOUBLE PRECISION,
    avg_event_quality DOUBLE PRECISION
)";

/// `INSERT ... SELECT` of this run's row
pub fn report_insert_sql(dialect: Dialect, pipeline_name: &str) -> String {
    format!(
        "\
INSERT INTO mart.data_quality_report (
    report_timestamp, pipeline_name, customers_count, orders_count,
    events_count, avg_order_quality, avg_event_quality
)
SELECT
    CURRENT_TIMESTAMP,
    {},
    (SELECT COUNT(*) FROM staging.stg_customers),
    (SELECT COUNT(*) FROM staging.stg_orders),
    (SELECT COUNT(*) FROM staging.stg_events),
    (SELECT AVG(order_amount_quality_score) FROM mart.daily_metrics),
    (SELECT AVG(event_type_quality_score) FROM mart.daily_metrics)",
        literal(dialect, Some(pipeline_name))
    )
}

/// Ensure the report table exists and append this run's row
pub async fn write_quality_report(
    session: &mut dyn Session,
    dialect: Dialect,
    pipeline_name: &str,
) -> Result<(), QualityError> {
    session.execute(REPORT_TABLE_DDL).await?;
    session.execute(&report_insert_sql(dialect, pipeline_name)).await?;
    tracing::info!(pipeline_name, "quality report row written to mart.data_quality_report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopqa_warehouse::{Connector, MockConnector};

    #[test]
    fn insert_quotes_pipeline_name() {
        let sql = report_insert_sql(Dialect::Snowflake, "O'Hare nightly");
        assert!(sql.contains("'O''Hare nightly'"));
        assert!(sql.starts_with("INSERT INTO mart.data_quality_report"));
    }

    #[tokio::test]
    async fn creates_then_appends() {
        let connector = MockConnector::new();
        let mut session = connector.connect().await.unwrap();

        write_quality_report(session.as_mut(), Dialect::Snowflake, "DAILY_PIPELINE")
            .await
            .unwrap();

        let statements = connector.statements().await;
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS mart.data_quality_report"));
        assert!(statements[1].contains("'DAILY_PIPELINE'"));
        assert!(!statements.iter().any(|s| s.contains("CREATE OR REPLACE")));
    }
}
