//! Search-analytics aggregation and cannibalization detection.
//!
//! Pure, single-threaded transformations over an in-memory slice of
//! [`serplens_core::SearchRow`] records:
//!
//! - `aggregate` — query→pages and page→queries groupings
//! - `cannibalization` — clusters of queries served by more than one page
//! - `anomaly` — period-over-period drop alerts
//! - `scoring` — expected-CTR, opportunity, value, and authority helpers
//! - `report` — orchestrator bundling the above into one result
//!
//! Every function is total and referentially transparent: malformed rows are
//! dropped rather than rejected, division-by-zero cases substitute a neutral
//! denominator, and inputs are never mutated.

pub mod aggregate;
pub mod anomaly;
pub mod cannibalization;
pub mod config;
pub mod report;
pub mod scoring;

pub use aggregate::{group_by_page, group_by_query, PageAggregate, PageMetric, QueryAggregate, QueryMetric};
pub use anomaly::{detect_anomalies, Alert, AlertKind, AlertSeverity};
pub use cannibalization::{find_cannibal_clusters, CannibalCluster};
pub use config::{AnalyticsConfig, AnomalyOptions, BlendWeights, CannibalOptions};
pub use report::{build_report, QueryOpportunity, SearchReport};
pub use scoring::{
    cannibalization_score, ctr_gap_opportunity, estimate_traffic_value, expected_ctr,
    keyword_value, link_opportunity_score, normalize, page_authority, priority_score,
    topical_overlap, CtrGapOpportunity, OpportunityTier, SearchIntent, SerpFeatures,
};
