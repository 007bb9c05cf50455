use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Period-over-period fractional deltas, pre-computed by the data collector.
///
/// The collector computes identical deltas for every row sharing a query, so
/// aggregation copies them verbatim from the first row of each group rather
/// than re-deriving them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PeriodDeltas {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clicks_change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impressions_change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctr_change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_change: Option<f64>,
}

/// One per-query/per-page search performance record over a date range.
///
/// Rows arrive as a flat JSON array from an external collector. They carry no
/// identity beyond their field values; multiple rows may share `query` and/or
/// `page`, and the aggregation layer merges them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRow {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub page: String,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub impressions: u64,
    /// Mean search-result rank for this (query, page) pair. 1 = top.
    #[serde(default)]
    pub position: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub deltas: PeriodDeltas,
}

impl SearchRow {
    /// Click-through rate for this row. 0 when impressions is 0.
    pub fn ctr(&self) -> f64 {
        if self.impressions == 0 {
            0.0
        } else {
            self.clicks as f64 / self.impressions as f64
        }
    }

    /// Grouping key for the query dimension: lowercased and trimmed.
    pub fn normalized_query(&self) -> String {
        self.query.trim().to_lowercase()
    }

    /// Grouping key for the page dimension: trimmed only. Page URLs keep
    /// their case since paths are case-sensitive.
    pub fn normalized_page(&self) -> &str {
        self.page.trim()
    }
}
