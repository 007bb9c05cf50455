//! Report orchestrator: runs the grouping, clustering, opportunity, and
//! anomaly stages over one (optionally two) periods of rows and bundles the
//! results for rendering or export.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use serplens_core::SearchRow;

use crate::aggregate::{group_by_page, group_by_query, PageAggregate, QueryAggregate};
use crate::anomaly::{detect_anomalies, Alert};
use crate::cannibalization::{find_cannibal_clusters, CannibalCluster};
use crate::config::AnalyticsConfig;
use crate::scoring::{ctr_gap_opportunity, CtrGapOpportunity, SerpFeatures};

/// A query whose leading page underperforms its expected CTR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOpportunity {
    pub query: String,
    /// The query's top page by clicks.
    pub page: String,
    pub impressions: u64,
    pub position: f64,
    pub observed_ctr: f64,
    #[serde(flatten)]
    pub opportunity: CtrGapOpportunity,
}

/// Everything derived from one reporting window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub queries: Vec<QueryAggregate>,
    pub pages: Vec<PageAggregate>,
    pub clusters: Vec<CannibalCluster>,
    /// Sorted by potential extra clicks descending.
    pub opportunities: Vec<QueryOpportunity>,
    /// Empty when no previous period was supplied.
    pub alerts: Vec<Alert>,
}

/// CTR-gap opportunities per query aggregate, sized on the aggregate's
/// impressions and observed CTR at the leading page's position. Queries with
/// no pages (impossible after grouping, but cheap to guard) or no gap are
/// skipped.
fn collect_opportunities(queries: &[QueryAggregate]) -> Vec<QueryOpportunity> {
    let mut opportunities: Vec<QueryOpportunity> = queries
        .iter()
        .filter_map(|agg| {
            let top = agg.pages.first()?;
            let opportunity = ctr_gap_opportunity(
                agg.total_impressions,
                agg.avg_ctr,
                top.position,
                &SerpFeatures::default(),
            );
            if opportunity.potential_extra_clicks == 0 {
                return None;
            }
            Some(QueryOpportunity {
                query: agg.query.clone(),
                page: top.page.clone(),
                impressions: agg.total_impressions,
                position: top.position,
                observed_ctr: agg.avg_ctr,
                opportunity,
            })
        })
        .collect();

    opportunities.sort_by(|a, b| {
        b.opportunity
            .potential_extra_clicks
            .cmp(&a.opportunity.potential_extra_clicks)
    });

    opportunities
}

/// Build a full report over `current`, with anomaly alerts when `previous`
/// is supplied.
pub fn build_report(
    current: &[SearchRow],
    previous: Option<&[SearchRow]>,
    config: &AnalyticsConfig,
) -> SearchReport {
    let start = Instant::now();

    let queries = group_by_query(current);
    let pages = group_by_page(current);
    let clusters = find_cannibal_clusters(current, &config.cannibalization);
    let opportunities = collect_opportunities(&queries);
    let alerts = match previous {
        Some(prev) => detect_anomalies(current, prev, &config.anomaly),
        None => Vec::new(),
    };

    let elapsed = start.elapsed();
    debug!(
        rows = current.len(),
        queries = queries.len(),
        pages = pages.len(),
        elapsed_ms = elapsed.as_millis(),
        "report stages complete"
    );
    info!(
        clusters = clusters.len(),
        opportunities = opportunities.len(),
        alerts = alerts.len(),
        "report built"
    );

    SearchReport {
        queries,
        pages,
        clusters,
        opportunities,
        alerts,
    }
}
