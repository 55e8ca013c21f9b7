//! shopqa core
//!
//! Shared domain model for the e-commerce data-quality pipeline.
//! Issue codes are part of the report format - never rename them.

pub mod checks;
pub mod config;
pub mod issue;
pub mod metrics;
pub mod report;
pub mod value;

pub use checks::{CustomerCompleteness, EventQuality, OrderValidity, QualityCheckResult};
pub use config::{
    Config, ConfigError, ConnectionSettings, DbtConfig, GeneratorConfig, PostgresSettings,
    SchedulerConfig, SnowflakeSettings, Thresholds, WarehouseBackend, WarehouseConfig,
};
pub use issue::{Issue, IssueCode, Severity};
pub use report::{ReportVersion, RunReport, RunSummary, TaskRecord, TaskStatus};
pub use value::{Row, SqlValue};
