//! Configuration schema (shopqa.toml) and warehouse credentials
//!
//! Everything in `shopqa.toml` is optional; a missing file or section falls
//! back to the defaults below. Warehouse credentials never live in the file,
//! they are read from the process environment (after `.env` is loaded by the
//! binary).

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Warehouse backend used for sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseBackend {
    /// Snowflake (the production target)
    Snowflake,

    /// PostgreSQL, handy for local runs against a disposable database
    Postgres,
}

impl Default for WarehouseBackend {
    fn default() -> Self {
        Self::Snowflake
    }
}

impl std::fmt::Display for WarehouseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snowflake => write!(f, "snowflake"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// Warehouse section of the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Backend type
    #[serde(rename = "type")]
    pub backend: WarehouseBackend,

    /// Rows per INSERT statement during ingestion
    pub ingest_batch_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            backend: WarehouseBackend::default(),
            ingest_batch_size: 500,
        }
    }
}

/// Synthetic data generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// RNG seed; identical seed and parameters give byte-identical files
    pub seed: u64,

    /// Number of base customers
    pub customers: usize,

    /// Number of base orders
    pub orders: usize,

    /// Number of base events
    pub events: usize,

    /// Probability that a nullable field is emitted empty
    pub null_rate: f64,

    /// Fraction of base rows re-appended as exact duplicates
    pub duplicate_rate: f64,

    /// Probability that a status/event type comes from the invalid set
    pub invalid_rate: f64,

    /// Probability that an order amount is negated
    pub negative_amount_rate: f64,

    /// Anchor for every generated timestamp, and the `_loaded_at` value
    pub reference_time: DateTime<Utc>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            customers: 1000,
            orders: 5000,
            events: 15000,
            null_rate: 0.03,
            duplicate_rate: 0.02,
            invalid_rate: 0.01,
            negative_amount_rate: 0.005,
            reference_time: Utc
                .with_ymd_and_hms(2025, 10, 31, 0, 0, 0)
                .single()
                .unwrap_or_default(),
        }
    }
}

/// Quality gate thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum ratio of customers with an email
    pub min_email_completeness: f64,

    /// Maximum tolerated orders with `total_amount < 0`
    pub max_negative_amounts: i64,

    /// Maximum tolerated orders flagged with an invalid status
    pub max_invalid_statuses: i64,

    /// Maximum tolerated events flagged with an invalid type
    pub max_invalid_event_types: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_email_completeness: 0.95,
            max_negative_amounts: 0,
            max_invalid_statuses: 0,
            max_invalid_event_types: 0,
        }
    }
}

/// dbt invocation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbtConfig {
    /// dbt executable name or path
    pub executable: String,

    /// dbt project directory (working directory of every step)
    pub project_dir: PathBuf,

    /// Value exported as DBT_PROFILES_DIR
    pub profiles_dir: PathBuf,
}

impl Default for DbtConfig {
    fn default() -> Self {
        Self {
            executable: "dbt".to_string(),
            project_dir: PathBuf::from("dbt"),
            profiles_dir: PathBuf::from("dbt"),
        }
    }
}

/// Task-level retry policy of the local task runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Extra attempts after the first failure
    pub retries: u32,

    /// Fixed delay between attempts, in seconds
    pub retry_delay_secs: u64,
}

impl SchedulerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retries: 1,
            retry_delay_secs: 300,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Pipeline name recorded in the quality report row
    #[serde(default = "default_pipeline_name")]
    pub pipeline_name: String,

    /// Directory holding customers.csv, orders.csv and events.csv
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Where the JSON run report is written
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,

    #[serde(default)]
    pub warehouse: WarehouseConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub dbt: DbtConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_pipeline_name() -> String {
    "DAILY_PIPELINE".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_report_path() -> PathBuf {
    PathBuf::from("target/quality-report.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline_name: default_pipeline_name(),
            data_dir: default_data_dir(),
            report_path: default_report_path(),
            warehouse: WarehouseConfig::default(),
            generator: GeneratorConfig::default(),
            thresholds: Thresholds::default(),
            dbt: DbtConfig::default(),
            scheduler: SchedulerConfig::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

/// Snowflake session settings (SNOWFLAKE_* variables)
#[derive(Debug, Clone, PartialEq)]
pub struct SnowflakeSettings {
    pub account: String,
    pub user: String,
    pub password: String,
    pub role: Option<String>,
    pub warehouse: Option<String>,
    pub database: String,
    pub schema: String,
}

/// PostgreSQL session settings
#[derive(Debug, Clone, PartialEq)]
pub struct PostgresSettings {
    /// libpq-style connection string or postgres:// URL
    pub url: String,
}

/// Credentials for the configured backend, read from the environment
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionSettings {
    Snowflake(SnowflakeSettings),
    Postgres(PostgresSettings),
}

impl ConnectionSettings {
    /// Read settings for `backend` from the process environment
    pub fn from_env(backend: WarehouseBackend) -> Result<Self, ConfigError> {
        Self::from_lookup(backend, |key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup
    ///
    /// Only presence is checked; values are passed through untouched.
    pub fn from_lookup<F>(backend: WarehouseBackend, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        match backend {
            WarehouseBackend::Snowflake => {
                let mut missing = Vec::new();
                let mut required = |key: &'static str| {
                    get(key).unwrap_or_else(|| {
                        missing.push(key);
                        String::new()
                    })
                };

                let account = required("SNOWFLAKE_ACCOUNT");
                let user = required("SNOWFLAKE_USER");
                let password = required("SNOWFLAKE_PASSWORD");

                if !missing.is_empty() {
                    return Err(ConfigError::MissingEnv(missing.join(", ")));
                }

                Ok(Self::Snowflake(SnowflakeSettings {
                    account,
                    user,
                    password,
                    role: get("SNOWFLAKE_ROLE"),
                    warehouse: get("SNOWFLAKE_WAREHOUSE"),
                    database: get("SNOWFLAKE_DATABASE")
                        .unwrap_or_else(|| "ECOMMERCE_DWH".to_string()),
                    schema: get("SNOWFLAKE_SCHEMA").unwrap_or_else(|| "RAW".to_string()),
                }))
            }
            WarehouseBackend::Postgres => {
                let url = get("SHOPQA_POSTGRES_URL")
                    .ok_or_else(|| ConfigError::MissingEnv("SHOPQA_POSTGRES_URL".to_string()))?;
                Ok(Self::Postgres(PostgresSettings { url }))
            }
        }
    }

    /// Database name, when the backend has one separate from the connection
    pub fn database(&self) -> Option<&str> {
        match self {
            Self::Snowflake(s) => Some(&s.database),
            Self::Postgres(_) => None,
        }
    }
}

/// Collect every `SNOWFLAKE_*` variable from a set of variables
///
/// dbt's profile reads its credentials from these, so they are forwarded
/// to each dbt step unchanged.
pub fn snowflake_env<I>(vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter(|(k, _)| k.starts_with("SNOWFLAKE_"))
        .collect()
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing environment variable(s): {0}")]
    MissingEnv(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.pipeline_name, "DAILY_PIPELINE");
        assert_eq!(config.data_dir, PathBuf::from("data/raw"));
        assert_eq!(config.warehouse.backend, WarehouseBackend::Snowflake);
        assert_eq!(config.scheduler.retries, 1);
        assert_eq!(config.scheduler.retry_delay(), Duration::from_secs(300));
    }

    #[test]
    fn generator_defaults_match_fixture_sizes() {
        let gen = GeneratorConfig::default();
        assert_eq!(gen.seed, 42);
        assert_eq!((gen.customers, gen.orders, gen.events), (1000, 5000, 15000));
        assert_eq!(gen.null_rate, 0.03);
        assert_eq!(gen.duplicate_rate, 0.02);
        assert_eq!(gen.invalid_rate, 0.01);
        assert_eq!(gen.negative_amount_rate, 0.005);
        assert_eq!(gen.reference_time.to_rfc3339(), "2025-10-31T00:00:00+00:00");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            pipeline_name = "NIGHTLY"

            [warehouse]
            type = "postgres"

            [thresholds]
            min_email_completeness = 0.9

            [scheduler]
            retries = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline_name, "NIGHTLY");
        assert_eq!(config.warehouse.backend, WarehouseBackend::Postgres);
        assert_eq!(config.warehouse.ingest_batch_size, 500);
        assert_eq!(config.thresholds.min_email_completeness, 0.9);
        assert_eq!(config.thresholds.max_negative_amounts, 0);
        assert_eq!(config.scheduler.retries, 3);
        assert_eq!(config.scheduler.retry_delay_secs, 300);
        assert_eq!(config.generator, GeneratorConfig::default());
    }

    #[test]
    fn reference_time_parses_from_string() {
        let config = Config::from_toml(
            r#"
            [generator]
            reference_time = "2024-01-01T12:00:00Z"
            "#,
        )
        .unwrap();
        assert_eq!(config.generator.reference_time.to_rfc3339(), "2024-01-01T12:00:00+00:00");
    }

    #[test]
    fn from_file_sets_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shopqa.toml");
        std::fs::write(&path, "data_dir = \"fixtures\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.project_root, dir.path());
        assert_eq!(config.resolve(&config.data_dir), dir.path().join("fixtures"));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = Config::from_toml("pipeline_name = ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn snowflake_settings_with_defaults() {
        let lookup = lookup_from(&[
            ("SNOWFLAKE_ACCOUNT", "xy12345"),
            ("SNOWFLAKE_USER", "loader"),
            ("SNOWFLAKE_PASSWORD", "secret"),
            ("SNOWFLAKE_WAREHOUSE", "COMPUTE_WH"),
        ]);

        let settings = ConnectionSettings::from_lookup(WarehouseBackend::Snowflake, lookup).unwrap();
        let ConnectionSettings::Snowflake(sf) = settings else {
            panic!("expected snowflake settings");
        };
        assert_eq!(sf.account, "xy12345");
        assert_eq!(sf.warehouse.as_deref(), Some("COMPUTE_WH"));
        assert_eq!(sf.role, None);
        assert_eq!(sf.database, "ECOMMERCE_DWH");
        assert_eq!(sf.schema, "RAW");
    }

    #[test]
    fn snowflake_settings_report_every_missing_variable() {
        let lookup = lookup_from(&[("SNOWFLAKE_USER", "loader"), ("SNOWFLAKE_PASSWORD", "")]);

        let err = ConnectionSettings::from_lookup(WarehouseBackend::Snowflake, lookup).unwrap_err();
        match err {
            ConfigError::MissingEnv(vars) => {
                assert_eq!(vars, "SNOWFLAKE_ACCOUNT, SNOWFLAKE_PASSWORD");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn postgres_settings_need_url() {
        let err = ConnectionSettings::from_lookup(WarehouseBackend::Postgres, lookup_from(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(_)));

        let settings = ConnectionSettings::from_lookup(
            WarehouseBackend::Postgres,
            lookup_from(&[("SHOPQA_POSTGRES_URL", "host=localhost user=qa")]),
        )
        .unwrap();
        assert_eq!(settings.database(), None);
    }

    #[test]
    fn snowflake_env_filters_prefix() {
        let vars = vec![
            ("SNOWFLAKE_ACCOUNT".to_string(), "xy".to_string()),
            ("HOME".to_string(), "/root".to_string()),
            ("SNOWFLAKE_ROLE".to_string(), "LOADER".to_string()),
        ];
        let env = snowflake_env(vars);
        assert_eq!(env.len(), 2);
        assert_eq!(env.get("SNOWFLAKE_ROLE").map(String::as_str), Some("LOADER"));
    }
}
