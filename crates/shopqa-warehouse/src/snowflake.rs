//! Snowflake sessions
//!
//! Statements go through the Snowflake SQL API. Query results arrive as
//! Arrow record batches; fixed-point NUMBER columns come back as integer
//! arrays carrying their scale in the field metadata, which is applied
//! when converting cells.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let connector = SnowflakeConnector::new(settings);
//! let mut session = connector.connect().await?;
//! let row = session.query_first("SELECT CURRENT_VERSION()").await?;
//! session.close().await?;
//! ```
//!
//! Reference: https://docs.snowflake.com/en/developer-guide/sql-api/index

use crate::session::{Connector, Dialect, Session, WarehouseError};
use shopqa_core::SnowflakeSettings;

#[cfg(feature = "snowflake")]
use shopqa_core::{Row, SqlValue};

#[cfg(feature = "snowflake")]
use snowflake_api::{QueryResult, SnowflakeApi};

#[cfg(feature = "snowflake")]
use arrow_array::cast::AsArray;

#[cfg(feature = "snowflake")]
use arrow_array::types::{
    Decimal128Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
};

#[cfg(feature = "snowflake")]
use arrow_array::{Array, RecordBatch};

#[cfg(feature = "snowflake")]
use arrow_schema::DataType;

/// Opens Snowflake sessions from SNOWFLAKE_* settings
#[derive(Clone)]
pub struct SnowflakeConnector {
    settings: SnowflakeSettings,
}

impl SnowflakeConnector {
    pub fn new(settings: SnowflakeSettings) -> Self {
        Self { settings }
    }

    /// Account identifier this connector targets
    pub fn account(&self) -> &str {
        &self.settings.account
    }

    /// Database sessions default to
    pub fn database(&self) -> &str {
        &self.settings.database
    }
}

impl std::fmt::Debug for SnowflakeConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeConnector")
            .field("account", &self.settings.account)
            .field("user", &self.settings.user)
            .field("warehouse", &self.settings.warehouse)
            .field("database", &self.settings.database)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Connector for SnowflakeConnector {
    fn name(&self) -> &'static str {
        "Snowflake"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Snowflake
    }

    #[cfg(feature = "snowflake")]
    async fn connect(&self) -> Result<Box<dyn Session>, WarehouseError> {
        let s = &self.settings;
        let api = SnowflakeApi::with_password_auth(
            &s.account,
            s.warehouse.as_deref(),
            Some(s.database.as_str()),
            Some(s.schema.as_str()),
            &s.user,
            s.role.as_deref(),
            &s.password,
        )
        .map_err(|e| WarehouseError::AuthenticationError(format!(
            "Failed to authenticate with Snowflake account {}: {}",
            s.account, e
        )))?;

        Ok(Box::new(SnowflakeSession { api: Some(api) }))
    }

    #[cfg(not(feature = "snowflake"))]
    async fn connect(&self) -> Result<Box<dyn Session>, WarehouseError> {
        Err(WarehouseError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string()
        ))
    }
}

/// One authenticated Snowflake session
#[cfg(feature = "snowflake")]
pub struct SnowflakeSession {
    api: Option<SnowflakeApi>,
}

#[cfg(feature = "snowflake")]
impl SnowflakeSession {
    fn api(&self) -> Result<&SnowflakeApi, WarehouseError> {
        self.api
            .as_ref()
            .ok_or_else(|| WarehouseError::ConnectionError("session already closed".to_string()))
    }

    async fn exec(&self, sql: &str) -> Result<QueryResult, WarehouseError> {
        self.api()?.exec(sql).await.map_err(|e| {
            let err_str = e.to_string();
            if err_str.contains("Incorrect username or password") || err_str.contains("authentication") {
                WarehouseError::AuthenticationError(err_str)
            } else if err_str.contains("error sending request") || err_str.contains("connect") {
                WarehouseError::ConnectionError(err_str)
            } else {
                WarehouseError::QueryError(err_str)
            }
        })
    }
}

#[cfg(feature = "snowflake")]
#[async_trait::async_trait]
impl Session for SnowflakeSession {
    async fn execute(&mut self, sql: &str) -> Result<u64, WarehouseError> {
        match self.exec(sql).await? {
            // DML answers with a single "number of rows inserted/updated" row
            QueryResult::Arrow(batches) => Ok(batches
                .iter()
                .filter(|b| b.num_rows() > 0 && b.num_columns() > 0)
                .filter(|b| b.schema().field(0).name().starts_with("number of rows"))
                .filter_map(|b| cell(b, 0, 0).ok().and_then(|v| v.as_i64()))
                .map(|n| n.max(0) as u64)
                .sum()),
            QueryResult::Json(_) | QueryResult::Empty => Ok(0),
        }
    }

    async fn query_first(&mut self, sql: &str) -> Result<Option<Row>, WarehouseError> {
        match self.exec(sql).await? {
            QueryResult::Arrow(batches) => {
                let Some(batch) = batches.iter().find(|b| b.num_rows() > 0) else {
                    return Ok(None);
                };

                let schema = batch.schema();
                let columns = schema.fields().iter().map(|f| f.name().clone()).collect();
                let values = (0..batch.num_columns())
                    .map(|col| cell(batch, col, 0))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Some(Row::new(columns, values)))
            }
            QueryResult::Json(_) => Err(WarehouseError::InvalidResponse(
                "Unexpected JSON result format".to_string()
            )),
            QueryResult::Empty => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), WarehouseError> {
        if let Some(mut api) = self.api.take() {
            api.close_session()
                .await
                .map_err(|e| WarehouseError::ConnectionError(format!("Failed to close session: {}", e)))?;
        }
        Ok(())
    }
}

/// Convert one Arrow cell into a [`SqlValue`]
#[cfg(feature = "snowflake")]
fn cell(batch: &RecordBatch, col: usize, row: usize) -> Result<SqlValue, WarehouseError> {
    let array = batch.column(col);
    if array.is_null(row) {
        return Ok(SqlValue::Null);
    }

    // Fixed-point NUMBER(p, s) arrives as an integer array with its scale in metadata
    let schema = batch.schema();
    let scale: i32 = schema
        .field(col)
        .metadata()
        .get("scale")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let scaled = |raw: i64| {
        if scale == 0 {
            SqlValue::Int(raw)
        } else {
            SqlValue::Float(raw as f64 / 10f64.powi(scale))
        }
    };

    let value = match array.data_type() {
        DataType::Boolean => SqlValue::Bool(array.as_boolean().value(row)),
        DataType::Int8 => scaled(i64::from(array.as_primitive::<Int8Type>().value(row))),
        DataType::Int16 => scaled(i64::from(array.as_primitive::<Int16Type>().value(row))),
        DataType::Int32 => scaled(i64::from(array.as_primitive::<Int32Type>().value(row))),
        DataType::Int64 => scaled(array.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => SqlValue::Float(f64::from(array.as_primitive::<Float32Type>().value(row))),
        DataType::Float64 => SqlValue::Float(array.as_primitive::<Float64Type>().value(row)),
        DataType::Decimal128(_, s) => {
            let raw = array.as_primitive::<Decimal128Type>().value(row);
            if *s == 0 {
                SqlValue::Int(raw as i64)
            } else {
                SqlValue::Float(raw as f64 / 10f64.powi(i32::from(*s)))
            }
        }
        DataType::Utf8 => SqlValue::Text(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => SqlValue::Text(array.as_string::<i64>().value(row).to_string()),
        other => {
            return Err(WarehouseError::InvalidResponse(format!(
                "Unsupported column type {} in column {}",
                other,
                schema.field(col).name()
            )));
        }
    };

    Ok(value)
}
