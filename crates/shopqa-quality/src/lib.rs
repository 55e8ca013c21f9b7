//! Quality gate for the staging layer
//!
//! This crate implements the data-quality logic of the pipeline:
//! - Aggregate checks over the staging tables ([`checks`])
//! - Threshold evaluation into [`Issue`](shopqa_core::Issue)s ([`gate`])
//! - Alert delivery ([`alert`])
//! - The per-run report row in the mart layer ([`report`])
//! - Declarative expectation suites for the mart tables ([`suites`])

pub mod alert;
pub mod checks;
pub mod gate;
pub mod report;
pub mod suites;

pub use alert::{alert_on_issues, AlertSink, CollectingSink, LogSink};
pub use checks::run_checks;
pub use gate::evaluate;
pub use report::write_quality_report;
pub use suites::{default_suites, write_suites, Checkpoint, Expectation, ExpectationSuite};

use shopqa_warehouse::WarehouseError;

/// Quality stage errors
#[derive(Debug, thiserror::Error)]
pub enum QualityError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("Check '{0}' returned no rows")]
    MissingResult(&'static str),

    #[error("Check '{check}' returned no column '{column}'")]
    MissingColumn {
        check: &'static str,
        column: &'static str,
    },

    #[error("Alert sink '{sink}' failed: {message}")]
    AlertFailed { sink: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
