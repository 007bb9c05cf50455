//! Period-over-period anomaly alerts on page-level aggregates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use serplens_core::SearchRow;

use crate::aggregate::group_by_page;
use crate::config::AnomalyOptions;

/// What moved against the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ClicksDrop,
    CtrDrop,
    /// Numeric position rose, i.e. rank got worse.
    PositionDrop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    High,
    Medium,
}

/// One triggered alert for a page present in both periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub page: String,
    /// Signed fractional delta that triggered the alert.
    pub change: f64,
    pub severity: AlertSeverity,
}

/// Fractional delta with the zero-previous guard: when the previous value is
/// 0, the denominator is replaced by 1 rather than skipping the comparison.
/// This can produce outsized deltas for pages with a legitimately-zero
/// baseline; kept as-is for parity with the collector's consumers.
fn fractional_change(current: f64, previous: f64) -> f64 {
    let denom = if previous == 0.0 { 1.0 } else { previous };
    (current - previous) / denom
}

/// Compare two periods of raw rows and emit drop alerts.
///
/// Both inputs are aggregated with `group_by_page` and matched by page URL;
/// pages present in only one period are skipped (there is no "new page" or
/// "removed page" alert kind). Per matched page, in order: clicks, CTR,
/// position. Clicks and CTR alert when the fractional change falls below
/// `-threshold`; position alerts when it rises above `threshold`, since a
/// larger numeric position is a worse rank. Severity is High when the
/// magnitude exceeds `high_severity`, else Medium.
pub fn detect_anomalies(
    current: &[SearchRow],
    previous: &[SearchRow],
    options: &AnomalyOptions,
) -> Vec<Alert> {
    let current_pages = group_by_page(current);
    let previous_pages = group_by_page(previous);

    let previous_by_url: HashMap<&str, &crate::aggregate::PageAggregate> = previous_pages
        .iter()
        .map(|p| (p.page.as_str(), p))
        .collect();

    let severity_for = |change: f64| {
        if change.abs() > options.high_severity {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        }
    };

    let mut alerts = Vec::new();

    for cur in &current_pages {
        let Some(prev) = previous_by_url.get(cur.page.as_str()) else {
            continue;
        };

        let clicks_change = fractional_change(cur.total_clicks as f64, prev.total_clicks as f64);
        if clicks_change < -options.threshold {
            alerts.push(Alert {
                kind: AlertKind::ClicksDrop,
                page: cur.page.clone(),
                change: clicks_change,
                severity: severity_for(clicks_change),
            });
        }

        let ctr_change = fractional_change(cur.avg_ctr, prev.avg_ctr);
        if ctr_change < -options.threshold {
            alerts.push(Alert {
                kind: AlertKind::CtrDrop,
                page: cur.page.clone(),
                change: ctr_change,
                severity: severity_for(ctr_change),
            });
        }

        let position_change = fractional_change(cur.avg_position, prev.avg_position);
        if position_change > options.threshold {
            alerts.push(Alert {
                kind: AlertKind::PositionDrop,
                page: cur.page.clone(),
                change: position_change,
                severity: severity_for(position_change),
            });
        }
    }

    debug!(
        current_pages = current_pages.len(),
        previous_pages = previous_pages.len(),
        alerts = alerts.len(),
        threshold = options.threshold,
        "anomaly detection complete"
    );

    alerts
}
