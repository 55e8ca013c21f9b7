//! Quality issue codes and reporting
//!
//! IMPORTANT: Issue codes are versioned and stable.
//! NEVER rename or remove codes - downstream alert routing keys on them.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Issue code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    /// Share of customers with an email is below the threshold
    EmailCompletenessBelowThreshold,

    /// Orders with `total_amount < 0`
    NegativeOrderAmounts,

    /// Orders whose status falls outside the known set
    InvalidOrderStatus,

    /// Events whose type falls outside the known set
    InvalidEventType,
}

impl IssueCode {
    /// Get the issue code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailCompletenessBelowThreshold => "EMAIL_COMPLETENESS_BELOW_THRESHOLD",
            Self::NegativeOrderAmounts => "NEGATIVE_ORDER_AMOUNTS",
            Self::InvalidOrderStatus => "INVALID_ORDER_STATUS",
            Self::InvalidEventType => "INVALID_EVENT_TYPE",
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Issue severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Worth a look, the data is still usable
    Warn,

    /// Data is wrong in a way consumers will notice
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A breached quality condition
///
/// Issues are business-level warnings. They never fail a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Stable issue code
    pub code: IssueCode,

    /// Severity level
    pub severity: Severity,

    /// Name of the check that produced the issue
    pub check: String,

    /// Human-readable message
    pub message: String,

    /// Threshold that was breached
    pub expected: Option<String>,

    /// Observed value
    pub actual: Option<String>,
}

impl Issue {
    /// Create a new issue with minimal fields
    pub fn new(
        code: IssueCode,
        severity: Severity,
        check: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity,
            check: check.into(),
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    /// Set expected/actual values
    pub fn with_comparison(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
