//! Expectation suites for the mart layer
//!
//! Suites are exported in the Great Expectations JSON layout so an external
//! validation runtime can execute them against `mart.customer_features` and
//! `mart.daily_metrics`. Nothing here evaluates an expectation.

use crate::QualityError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// One declarative rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    pub expectation_type: String,
    pub kwargs: Map<String, Value>,
}

impl Expectation {
    fn new(expectation_type: &str, kwargs: Value) -> Self {
        Self {
            expectation_type: expectation_type.to_string(),
            kwargs: match kwargs {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }

    fn unique(column: &str) -> Self {
        Self::new("expect_column_values_to_be_unique", json!({ "column": column }))
    }

    fn not_null(column: &str, mostly: Option<f64>) -> Self {
        let mut kwargs = json!({ "column": column });
        if let Some(mostly) = mostly {
            kwargs["mostly"] = json!(mostly);
        }
        Self::new("expect_column_values_to_not_be_null", kwargs)
    }

    fn between(column: &str, min: Option<f64>, max: Option<f64>, mostly: Option<f64>) -> Self {
        let mut kwargs = json!({ "column": column });
        if let Some(min) = min {
            kwargs["min_value"] = json!(min);
        }
        if let Some(max) = max {
            kwargs["max_value"] = json!(max);
        }
        if let Some(mostly) = mostly {
            kwargs["mostly"] = json!(mostly);
        }
        Self::new("expect_column_values_to_be_between", kwargs)
    }

    fn aggregate_between(expectation_type: &str, column: &str, min: f64, max: f64) -> Self {
        Self::new(
            expectation_type,
            json!({ "column": column, "min_value": min, "max_value": max }),
        )
    }

    /// Column the rule applies to
    pub fn column(&self) -> Option<&str> {
        self.kwargs.get("column").and_then(Value::as_str)
    }
}

/// A named set of expectations for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationSuite {
    pub expectation_suite_name: String,
    pub expectations: Vec<Expectation>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl ExpectationSuite {
    fn new(name: &str, table: &str, expectations: Vec<Expectation>) -> Self {
        let mut meta = Map::new();
        meta.insert("table".to_string(), json!(table));
        Self {
            expectation_suite_name: name.to_string(),
            expectations,
            meta,
        }
    }

    /// Checkpoint binding this suite to a run
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            name: format!("{}_checkpoint", self.expectation_suite_name),
            config_version: 1.0,
            class_name: "SimpleCheckpoint".to_string(),
            run_name_template: format!("{}_%Y%m%d-%H%M%S", self.expectation_suite_name),
            expectation_suite_name: self.expectation_suite_name.clone(),
        }
    }
}

/// Checkpoint configuration for one suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub name: String,
    pub config_version: f64,
    pub class_name: String,
    pub run_name_template: String,
    pub expectation_suite_name: String,
}

/// Feature-table rules: keys, value ranges, distribution and completeness
pub fn customer_features_suite() -> ExpectationSuite {
    use Expectation as E;
    ExpectationSuite::new(
        "customer_features_suite",
        "mart.customer_features",
        vec![
            E::unique("customer_id"),
            E::not_null("customer_id", None),
            E::between("total_orders", Some(0.0), Some(1000.0), None),
            E::between("total_spend", Some(0.0), Some(100_000.0), None),
            E::between("avg_order_value", Some(0.0), Some(10_000.0), None),
            E::between("conversion_rate", Some(0.0), Some(1.0), None),
            E::between("cancellation_rate", Some(0.0), Some(1.0), None),
            // three years
            E::between("recency_days", Some(0.0), Some(1095.0), None),
            E::between("frequency", Some(0.0), Some(1000.0), None),
            E::between("monetary_value", Some(0.0), Some(100_000.0), None),
            E::aggregate_between("expect_column_mean_to_be_between", "total_orders", 1.0, 50.0),
            E::aggregate_between("expect_column_stdev_to_be_between", "total_spend", 0.0, 10_000.0),
            E::not_null("total_orders", Some(1.0)),
            // customers without orders have no recency
            E::not_null("recency_days", Some(0.95)),
        ],
    )
}

/// Daily trend rules: one row per day, quality scores and revenue sanity
pub fn daily_metrics_suite() -> ExpectationSuite {
    use Expectation as E;
    ExpectationSuite::new(
        "daily_metrics_suite",
        "mart.daily_metrics",
        vec![
            E::unique("metric_date"),
            E::between("order_amount_quality_score", Some(0.90), Some(1.0), Some(0.95)),
            E::between("order_status_quality_score", Some(0.90), Some(1.0), Some(0.95)),
            E::between("event_type_quality_score", Some(0.90), Some(1.0), Some(0.95)),
            E::between("total_orders", Some(0.0), Some(10_000.0), None),
            E::between("total_revenue", Some(0.0), Some(1_000_000.0), None),
            E::between("total_revenue", Some(100.0), None, Some(0.90)),
        ],
    )
}

pub fn default_suites() -> Vec<ExpectationSuite> {
    vec![customer_features_suite(), daily_metrics_suite()]
}

/// Write `expectations/<suite>.json` and `checkpoints/<suite>_checkpoint.json`
/// under `dir`, returning the written paths
pub fn write_suites(dir: &Path, suites: &[ExpectationSuite]) -> Result<Vec<PathBuf>, QualityError> {
    let expectations_dir = dir.join("expectations");
    let checkpoints_dir = dir.join("checkpoints");
    std::fs::create_dir_all(&expectations_dir)?;
    std::fs::create_dir_all(&checkpoints_dir)?;

    let mut written = Vec::with_capacity(suites.len() * 2);
    for suite in suites {
        let suite_path = expectations_dir.join(format!("{}.json", suite.expectation_suite_name));
        std::fs::write(&suite_path, serde_json::to_string_pretty(suite)?)?;
        written.push(suite_path);

        let checkpoint = suite.checkpoint();
        let checkpoint_path = checkpoints_dir.join(format!("{}.json", checkpoint.name));
        std::fs::write(&checkpoint_path, serde_json::to_string_pretty(&checkpoint)?)?;
        written.push(checkpoint_path);

        tracing::info!(suite = %suite.expectation_suite_name, rules = suite.expectations.len(), "expectation suite written");
    }
    Ok(written)
}
