//! Run report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use crate::checks::QualityCheckResult;
use crate::issue::Issue;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Final state of one task in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Succeeded,
    Failed,
    /// Not attempted because an upstream task failed
    Skipped,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Outcome of one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task identifier (e.g. `ingest_orders`)
    pub task_id: String,

    pub status: TaskStatus,

    /// Attempts made (0 when skipped)
    pub attempts: u32,

    /// Wall time across all attempts
    pub duration_ms: u64,

    /// Short human-readable result (e.g. "5100 rows")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Last error, for failed tasks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn skipped(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Skipped,
            attempts: 0,
            duration_ms: 0,
            detail: None,
            error: None,
        }
    }
}

/// Summary statistics for a run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub tasks: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,

    /// Quality issues raised (never counted as failures)
    pub issues: usize,
}

/// Pipeline run report (run-report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Pipeline name
    pub pipeline_name: String,

    /// Summary statistics
    pub summary: RunSummary,

    /// Task outcomes in execution order
    pub tasks: Vec<TaskRecord>,

    /// Check results, when validation ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityCheckResult>,

    /// Breached quality conditions
    pub issues: Vec<Issue>,
}

impl RunReport {
    /// Create a new empty report
    pub fn new(pipeline_name: impl Into<String>) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            pipeline_name: pipeline_name.into(),
            summary: RunSummary::default(),
            tasks: Vec::new(),
            quality: None,
            issues: Vec::new(),
        }
    }

    /// Record a task outcome
    pub fn add_task(&mut self, record: TaskRecord) {
        match record.status {
            TaskStatus::Succeeded => self.summary.succeeded += 1,
            TaskStatus::Failed => self.summary.failed += 1,
            TaskStatus::Skipped => self.summary.skipped += 1,
        }

        self.summary.tasks += 1;
        self.tasks.push(record);
    }

    /// Attach quality results and the issues derived from them
    pub fn set_quality(&mut self, quality: QualityCheckResult, issues: Vec<Issue>) {
        self.summary.issues = issues.len();
        self.quality = Some(quality);
        self.issues = issues;
    }

    /// Look up a task outcome
    pub fn task(&self, task_id: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    /// True when any task failed; quality issues alone never fail a run
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file, creating parent directories
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{IssueCode, Severity};

    fn record(task_id: &str, status: TaskStatus) -> TaskRecord {
        TaskRecord {
            task_id: task_id.to_string(),
            status,
            attempts: 1,
            duration_ms: 5,
            detail: None,
            error: None,
        }
    }

    #[test]
    fn empty_report() {
        let report = RunReport::new("DAILY_PIPELINE");
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary.tasks, 0);
        assert!(!report.has_failures());
    }

    #[test]
    fn summary_counts_statuses() {
        let mut report = RunReport::new("DAILY_PIPELINE");
        report.add_task(record("init_warehouse", TaskStatus::Succeeded));
        report.add_task(record("ingest_orders", TaskStatus::Failed));
        report.add_task(TaskRecord::skipped("dbt_deps"));

        assert_eq!(report.summary.tasks, 3);
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.skipped, 1);
        assert!(report.has_failures());
        assert_eq!(report.task("dbt_deps").map(|t| t.attempts), Some(0));
    }

    #[test]
    fn issues_do_not_fail_the_run() {
        let mut report = RunReport::new("DAILY_PIPELINE");
        report.add_task(record("validate_quality", TaskStatus::Succeeded));
        report.set_quality(
            QualityCheckResult::default(),
            vec![Issue::new(IssueCode::NegativeOrderAmounts, Severity::Error, "orders_validity", "x")],
        );

        assert_eq!(report.summary.issues, 1);
        assert!(!report.has_failures());
    }

    #[test]
    fn report_serialization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/run.json");

        let report = RunReport::new("DAILY_PIPELINE");
        report.save_to_file(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"pipeline_name\": \"DAILY_PIPELINE\""));
        assert!(!json.contains("\"quality\""));
    }
}
