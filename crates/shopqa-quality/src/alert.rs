//! Alert delivery
//!
//! The alert decision is [`evaluate`](crate::gate::evaluate); sinks only
//! deliver what it produced. Delivery failures are reported to the caller,
//! never turned into quality issues.

use crate::gate::evaluate;
use crate::QualityError;
use shopqa_core::{Issue, QualityCheckResult, Severity, Thresholds};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Destination for quality issues
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deliver the issues of one run; called with an empty slice on a clean run
    async fn deliver(&self, issues: &[Issue]) -> Result<(), QualityError>;
}

/// Writes issues to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait::async_trait]
impl AlertSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, issues: &[Issue]) -> Result<(), QualityError> {
        if issues.is_empty() {
            tracing::info!("all data quality checks passed");
            return Ok(());
        }

        tracing::warn!(count = issues.len(), "data quality issues detected");
        for issue in issues {
            match issue.severity {
                Severity::Error => tracing::error!(code = %issue.code, check = %issue.check, "{}", issue.message),
                Severity::Warn => tracing::warn!(code = %issue.code, check = %issue.check, "{}", issue.message),
                Severity::Info => tracing::info!(code = %issue.code, check = %issue.check, "{}", issue.message),
            }
        }
        Ok(())
    }
}

/// Keeps every delivery in memory
///
/// Clones share the recorded deliveries.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    deliveries: Arc<Mutex<Vec<Vec<Issue>>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn deliveries(&self) -> Vec<Vec<Issue>> {
        self.deliveries.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl AlertSink for CollectingSink {
    fn name(&self) -> &'static str {
        "collecting"
    }

    async fn deliver(&self, issues: &[Issue]) -> Result<(), QualityError> {
        self.deliveries.lock().await.push(issues.to_vec());
        Ok(())
    }
}

/// Evaluate `result` and hand the issues to `sink`
///
/// Returns the issues so the caller can record them.
pub async fn alert_on_issues(
    result: &QualityCheckResult,
    thresholds: &Thresholds,
    sink: &dyn AlertSink,
) -> Result<Vec<Issue>, QualityError> {
    let issues = evaluate(result, thresholds);
    sink.deliver(&issues).await?;
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopqa_core::IssueCode;

    #[tokio::test]
    async fn clean_run_delivers_empty_list() {
        let sink = CollectingSink::new();
        let mut result = QualityCheckResult::default();
        result.customers_completeness.email_completeness = 1.0;

        let issues = alert_on_issues(&result, &Thresholds::default(), &sink).await.unwrap();
        assert!(issues.is_empty());
        assert_eq!(sink.deliveries().await, vec![Vec::<Issue>::new()]);
    }

    #[tokio::test]
    async fn breaches_reach_the_sink() {
        let sink = CollectingSink::new();
        let mut result = QualityCheckResult::default();
        result.customers_completeness.email_completeness = 1.0;
        result.orders_validity.negative_amounts = 3;

        let issues = alert_on_issues(&result, &Thresholds::default(), &sink).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::NegativeOrderAmounts);
        assert_eq!(sink.deliveries().await[0], issues);
    }

    #[tokio::test]
    async fn log_sink_never_fails() {
        let issue = shopqa_core::Issue::new(IssueCode::InvalidEventType, Severity::Warn, "events_quality", "x");
        assert!(LogSink.deliver(&[issue]).await.is_ok());
        assert!(LogSink.deliver(&[]).await.is_ok());
    }
}
