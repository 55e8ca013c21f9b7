//! Threshold evaluation
//!
//! Turns one [`QualityCheckResult`] into the list of breached conditions.
//! An empty list is the only pass signal. Nothing here fails a run.

use shopqa_core::{Issue, IssueCode, QualityCheckResult, Severity, Thresholds};

/// Compare check results against thresholds
pub fn evaluate(result: &QualityCheckResult, thresholds: &Thresholds) -> Vec<Issue> {
    let mut issues = Vec::new();

    let completeness = result.customers_completeness.email_completeness;
    if completeness < thresholds.min_email_completeness {
        issues.push(
            Issue::new(
                IssueCode::EmailCompletenessBelowThreshold,
                Severity::Warn,
                "customers_completeness",
                format!("Customer email completeness: {}", percent(completeness)),
            )
            .with_comparison(
                format!(">= {}", percent(thresholds.min_email_completeness)),
                percent(completeness),
            ),
        );
    }

    let negative = result.orders_validity.negative_amounts;
    if negative > thresholds.max_negative_amounts {
        issues.push(
            Issue::new(
                IssueCode::NegativeOrderAmounts,
                Severity::Error,
                "orders_validity",
                format!("Found {} orders with negative amounts", negative),
            )
            .with_comparison(format!("<= {}", thresholds.max_negative_amounts), negative.to_string()),
        );
    }

    let invalid_statuses = result.orders_validity.invalid_statuses;
    if invalid_statuses > thresholds.max_invalid_statuses {
        issues.push(
            Issue::new(
                IssueCode::InvalidOrderStatus,
                Severity::Error,
                "orders_validity",
                format!("Found {} orders with invalid status", invalid_statuses),
            )
            .with_comparison(
                format!("<= {}", thresholds.max_invalid_statuses),
                invalid_statuses.to_string(),
            ),
        );
    }

    let invalid_types = result.events_quality.invalid_event_types;
    if invalid_types > thresholds.max_invalid_event_types {
        issues.push(
            Issue::new(
                IssueCode::InvalidEventType,
                Severity::Warn,
                "events_quality",
                format!("Found {} events with invalid types", invalid_types),
            )
            .with_comparison(
                format!("<= {}", thresholds.max_invalid_event_types),
                invalid_types.to_string(),
            ),
        );
    }

    issues
}

/// `0.942` -> `94.20%`
fn percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shopqa_core::{CustomerCompleteness, EventQuality, OrderValidity};

    fn clean() -> QualityCheckResult {
        QualityCheckResult {
            customers_completeness: CustomerCompleteness {
                total_rows: 1000,
                non_null_customer_id: 1000,
                non_null_email: 980,
                email_completeness: 0.98,
            },
            orders_validity: OrderValidity {
                total_orders: 5000,
                negative_amounts: 0,
                invalid_statuses: 0,
            },
            events_quality: EventQuality {
                total_events: 15000,
                invalid_event_types: 0,
                unique_customers: 1000,
            },
        }
    }

    #[test]
    fn clean_result_has_no_issues() {
        assert!(evaluate(&clean(), &Thresholds::default()).is_empty());
    }

    #[test]
    fn completeness_breach_message() {
        let mut result = clean();
        result.customers_completeness.email_completeness = 0.942;

        let issues = evaluate(&result, &Thresholds::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::EmailCompletenessBelowThreshold);
        assert_eq!(issues[0].message, "Customer email completeness: 94.20%");
        assert_eq!(issues[0].expected.as_deref(), Some(">= 95.00%"));
    }

    #[test]
    fn completeness_at_threshold_passes() {
        let mut result = clean();
        result.customers_completeness.email_completeness = 0.95;
        assert!(evaluate(&result, &Thresholds::default()).is_empty());
    }

    #[test]
    fn every_breach_is_reported_in_order() {
        let mut result = clean();
        result.customers_completeness.email_completeness = 0.5;
        result.orders_validity.negative_amounts = 3;
        result.orders_validity.invalid_statuses = 2;
        result.events_quality.invalid_event_types = 7;

        let messages: Vec<_> = evaluate(&result, &Thresholds::default())
            .into_iter()
            .map(|i| i.message)
            .collect();
        assert_eq!(
            messages,
            vec![
                "Customer email completeness: 50.00%",
                "Found 3 orders with negative amounts",
                "Found 2 orders with invalid status",
                "Found 7 events with invalid types",
            ]
        );
    }

    #[test]
    fn empty_staging_fails_completeness() {
        let issues = evaluate(&QualityCheckResult::default(), &Thresholds::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Customer email completeness: 0.00%");
    }

    #[test]
    fn thresholds_are_configurable() {
        let mut result = clean();
        result.orders_validity.negative_amounts = 3;
        let lenient = Thresholds {
            max_negative_amounts: 5,
            ..Thresholds::default()
        };
        assert!(evaluate(&result, &lenient).is_empty());
    }
}
