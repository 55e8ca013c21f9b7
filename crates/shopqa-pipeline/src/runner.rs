//! Level-by-level execution of the task graph

use crate::dag::{default_pipeline, TaskGraph};
use crate::tasks::{generate_quality_report, ingest_csv, init_warehouse, validate_quality, Task};
use crate::PipelineError;
use futures::future::join_all;
use shopqa_core::{Config, Issue, QualityCheckResult, RunReport, TaskRecord, TaskStatus};
use shopqa_quality::{alert_on_issues, AlertSink, LogSink};
use shopqa_transform::Transformer;
use shopqa_warehouse::{Connector, QualifiedName};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// What a finished task hands to the rest of the run
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    /// Nothing beyond a short description
    Done(String),

    /// Result of `validate_quality`, consumed by `alert_on_issues`
    Quality(QualityCheckResult),

    /// Issues raised by `alert_on_issues`
    Issues(Vec<Issue>),
}

impl TaskOutput {
    pub fn detail(&self) -> String {
        match self {
            Self::Done(detail) => detail.clone(),
            Self::Quality(q) => format!(
                "{} customers, {} orders, {} events checked",
                q.customers_completeness.total_rows,
                q.orders_validity.total_orders,
                q.events_quality.total_events
            ),
            Self::Issues(issues) if issues.is_empty() => "no issues".to_string(),
            Self::Issues(issues) => format!("{} issue(s)", issues.len()),
        }
    }
}

/// The daily pipeline bound to a warehouse, a dbt runner and an alert sink
pub struct Pipeline {
    config: Config,
    connector: Arc<dyn Connector>,
    transformer: Transformer,
    sink: Arc<dyn AlertSink>,
    database: Option<String>,
    graph: TaskGraph,
}

impl Pipeline {
    /// Full pipeline graph, alerts to the log
    pub fn new(config: Config, connector: Arc<dyn Connector>, transformer: Transformer) -> Self {
        Self {
            config,
            connector,
            transformer,
            sink: Arc::new(LogSink),
            database: None,
            graph: default_pipeline(true),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Database created and selected by `init_warehouse`
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Drop the dbt tasks from the graph
    pub fn without_transform(mut self) -> Self {
        self.graph = default_pipeline(false);
        self
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Run every task once its parents succeeded
    ///
    /// Task failures are recorded in the report, not returned; only an
    /// unschedulable graph is an error.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let stages = self.graph.stages()?;
        let mut report = RunReport::new(&self.config.pipeline_name);
        let mut skipped: HashSet<String> = HashSet::new();
        let mut quality: Option<QualityCheckResult> = None;
        let mut issues: Vec<Issue> = Vec::new();

        tracing::info!(
            pipeline = %self.config.pipeline_name,
            tasks = self.graph.tasks().len(),
            stages = stages.len(),
            "pipeline run started"
        );

        for stage in stages {
            let runnable: Vec<&String> = stage.iter().filter(|id| !skipped.contains(*id)).collect();
            let results = join_all(runnable.iter().map(|id| self.run_with_retry(id, quality.as_ref()))).await;

            for id in stage.iter().filter(|id| skipped.contains(*id)) {
                tracing::warn!(task = %id, "skipped because an upstream task failed");
                report.add_task(TaskRecord::skipped(id.as_str()));
            }

            for (id, (record, output)) in runnable.into_iter().zip(results) {
                if record.status == TaskStatus::Failed {
                    skipped.extend(self.graph.downstream(id));
                }
                match output {
                    Some(TaskOutput::Quality(q)) => quality = Some(q),
                    Some(TaskOutput::Issues(i)) => issues = i,
                    _ => {}
                }
                report.add_task(record);
            }
        }

        if let Some(quality) = quality {
            report.set_quality(quality, issues);
        }

        tracing::info!(
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            skipped = report.summary.skipped,
            issues = report.summary.issues,
            "pipeline run finished"
        );
        Ok(report)
    }

    /// Run one task, retrying with a fixed delay
    async fn run_with_retry(&self, id: &str, quality: Option<&QualityCheckResult>) -> (TaskRecord, Option<TaskOutput>) {
        let started = Instant::now();
        let max_attempts = self.config.scheduler.retries + 1;
        let mut attempts = 0;

        loop {
            attempts += 1;
            tracing::info!(task = %id, attempt = attempts, "task started");

            match self.run_task(id, quality).await {
                Ok(output) => {
                    let detail = output.detail();
                    tracing::info!(task = %id, %detail, "task succeeded");
                    let record = TaskRecord {
                        task_id: id.to_string(),
                        status: TaskStatus::Succeeded,
                        attempts,
                        duration_ms: started.elapsed().as_millis() as u64,
                        detail: Some(detail),
                        error: None,
                    };
                    return (record, Some(output));
                }
                Err(e) if attempts < max_attempts => {
                    let delay = self.config.scheduler.retry_delay();
                    tracing::warn!(task = %id, attempt = attempts, error = %e, ?delay, "task failed; retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(task = %id, attempts, error = %e, "task failed");
                    let record = TaskRecord {
                        task_id: id.to_string(),
                        status: TaskStatus::Failed,
                        attempts,
                        duration_ms: started.elapsed().as_millis() as u64,
                        detail: None,
                        error: Some(e.to_string()),
                    };
                    return (record, None);
                }
            }
        }
    }

    async fn run_task(&self, id: &str, quality: Option<&QualityCheckResult>) -> Result<TaskOutput, PipelineError> {
        let task = Task::from_id(id).ok_or_else(|| PipelineError::UnknownTask(id.to_string()))?;
        let connector = self.connector.as_ref();

        match task {
            Task::InitWarehouse => {
                let version = init_warehouse(connector, self.database.as_deref()).await?;
                Ok(TaskOutput::Done(format!("warehouse version {}", version)))
            }
            Task::IngestCustomers | Task::IngestOrders | Task::IngestEvents => {
                let (table, file) = task
                    .ingest_source()
                    .ok_or_else(|| PipelineError::UnknownTask(id.to_string()))?;
                let table = QualifiedName::parse(table)?;
                let path = self.config.resolve(&self.config.data_dir).join(file);
                let rows = ingest_csv(connector, &table, &path, self.config.warehouse.ingest_batch_size).await?;
                Ok(TaskOutput::Done(format!("{} rows", rows)))
            }
            Task::Dbt(step) => {
                let outcome = self.transformer.run_step(step).await?;
                Ok(TaskOutput::Done(outcome.command))
            }
            Task::ValidateQuality => Ok(TaskOutput::Quality(validate_quality(connector).await?)),
            Task::AlertOnIssues => {
                let quality = quality.ok_or(PipelineError::MissingInput {
                    task: "alert_on_issues",
                    input: "validate_quality",
                })?;
                let issues = alert_on_issues(quality, &self.config.thresholds, self.sink.as_ref()).await?;
                Ok(TaskOutput::Issues(issues))
            }
            Task::GenerateQualityReport => {
                generate_quality_report(connector, &self.config.pipeline_name).await?;
                Ok(TaskOutput::Done("report row appended".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_details() {
        assert_eq!(TaskOutput::Done("5100 rows".into()).detail(), "5100 rows");
        assert_eq!(TaskOutput::Issues(Vec::new()).detail(), "no issues");
        assert_eq!(
            TaskOutput::Quality(QualityCheckResult::default()).detail(),
            "0 customers, 0 orders, 0 events checked"
        );
    }
}
