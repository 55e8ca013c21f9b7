//! Task graph runner for the daily data-quality pipeline
//!
//! The pipeline is a fixed graph of tasks:
//!
//! ```text
//! init_warehouse
//!   -> ingest_customers | ingest_orders | ingest_events
//!   -> dbt_deps -> dbt_run_staging -> dbt_test_staging -> dbt_run_mart -> dbt_test_mart
//!   -> validate_quality
//!   -> alert_on_issues | generate_quality_report
//! ```
//!
//! Tasks of one level run concurrently. A failed task is retried with a
//! fixed delay, and when it keeps failing everything downstream is skipped.

pub mod dag;
pub mod runner;
pub mod tasks;

pub use dag::{default_pipeline, TaskGraph, TaskId};
pub use runner::{Pipeline, TaskOutput};
pub use tasks::{generate_quality_report, ingest_csv, init_warehouse, validate_quality, Task};

use shopqa_quality::QualityError;
use shopqa_transform::TransformError;
use shopqa_warehouse::WarehouseError;

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Quality(#[from] QualityError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Task graph has a cycle through: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("Task '{task}' needs the output of '{input}', which did not run")]
    MissingInput {
        task: &'static str,
        input: &'static str,
    },
}
