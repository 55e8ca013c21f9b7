//! SQL text builders for ingestion
//!
//! Table and column names end up interpolated into statements, so they are
//! restricted to plain identifiers. Values are emitted as escaped literals.

use crate::session::{Dialect, WarehouseError};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("identifier regex is valid")
    })
}

/// Check that `name` is a plain, unquoted SQL identifier
pub fn validate_identifier(name: &str) -> Result<&str, WarehouseError> {
    if identifier_pattern().is_match(name) {
        Ok(name)
    } else {
        Err(WarehouseError::InvalidIdentifier(name.to_string()))
    }
}

/// A `schema.table` name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub schema: String,
    pub table: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Result<Self, WarehouseError> {
        let schema = schema.into();
        let table = table.into();
        validate_identifier(&schema)?;
        validate_identifier(&table)?;
        Ok(Self { schema, table })
    }

    /// Parse `schema.table`
    pub fn parse(name: &str) -> Result<Self, WarehouseError> {
        match name.split_once('.') {
            Some((schema, table)) => Self::new(schema, table),
            None => Err(WarehouseError::InvalidIdentifier(format!(
                "{} (expected schema.table)",
                name
            ))),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Render a text value as a SQL literal (`NULL` for a missing value)
pub fn literal(dialect: Dialect, value: Option<&str>) -> String {
    match value {
        None => "NULL".to_string(),
        Some(v) => {
            let mut escaped = String::with_capacity(v.len() + 2);
            escaped.push('\'');
            for ch in v.chars() {
                match ch {
                    '\'' => escaped.push_str("''"),
                    // Snowflake treats backslash as an escape inside string literals
                    '\\' if dialect == Dialect::Snowflake => escaped.push_str("\\\\"),
                    _ => escaped.push(ch),
                }
            }
            escaped.push('\'');
            escaped
        }
    }
}

/// `CREATE TABLE IF NOT EXISTS` with every column typed VARCHAR
pub fn create_varchar_table(table: &QualifiedName, columns: &[String]) -> Result<String, WarehouseError> {
    if columns.is_empty() {
        return Err(WarehouseError::InvalidIdentifier(format!("{} has no columns", table)));
    }

    let defs = columns
        .iter()
        .map(|c| validate_identifier(c).map(|c| format!("{} VARCHAR", c)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(format!("CREATE TABLE IF NOT EXISTS {} ({})", table, defs.join(", ")))
}

/// A multi-row INSERT for one slice of rows
#[derive(Debug, Clone, PartialEq)]
pub struct InsertBatch {
    pub sql: String,
    pub rows: usize,
}

impl InsertBatch {
    /// Build `INSERT INTO table (cols) VALUES (...), (...)`
    ///
    /// Every row must have exactly one cell per column.
    pub fn build(
        dialect: Dialect,
        table: &QualifiedName,
        columns: &[String],
        rows: &[Vec<Option<String>>],
    ) -> Result<Self, WarehouseError> {
        for c in columns {
            validate_identifier(c)?;
        }

        let mut sql = format!("INSERT INTO {} ({}) VALUES ", table, columns.join(", "));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(WarehouseError::InvalidResponse(format!(
                    "row {} has {} cells, expected {}",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('(');
            let cells: Vec<String> = row.iter().map(|v| literal(dialect, v.as_deref())).collect();
            sql.push_str(&cells.join(", "));
            sql.push(')');
        }

        Ok(Self { sql, rows: rows.len() })
    }
}
