//! Cannibalization cluster detection: queries served by more than one page
//! on the same site, diluting authority and clicks.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use serplens_core::SearchRow;

use crate::aggregate::{collect_query_groups, PageMetric};
use crate::config::CannibalOptions;

/// A query with multiple competing pages, ranked by blended score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CannibalCluster {
    pub query: String,
    /// Sorted by blended score descending; `pages[0]` is the primary.
    pub pages: Vec<PageMetric>,
    /// The page judged the best consolidation target.
    pub primary_candidate: String,
    /// Human-readable summary of the cluster.
    pub rationale: String,
    pub total_impressions: u64,
    pub page_count: usize,
}

/// Detect cannibalization clusters among `rows`.
///
/// Grouping is identical to `group_by_query`. Each page in a group gets a
/// blended score with every term normalized against the best page in that
/// group:
///
/// ```text
/// score = w_imp * (impressions / max_impressions)
///       + w_clk * (clicks / max_clicks)
///       + w_pos * (min_position / position)
/// ```
///
/// The position term rewards lower (better) rank. Groups with fewer than
/// `min_pages` pages or fewer than `min_impressions` summed impressions are
/// discarded. Returned clusters sort by total impressions descending. The
/// weights are fixed heuristic constants with no statistical derivation;
/// they live in [`CannibalOptions`] so deployments can tune them.
pub fn find_cannibal_clusters(rows: &[SearchRow], options: &CannibalOptions) -> Vec<CannibalCluster> {
    let groups = collect_query_groups(rows);
    let weights = options.blend;

    let mut clusters: Vec<CannibalCluster> = groups
        .into_iter()
        .filter_map(|(query, group)| {
            if group.pages.len() < options.min_pages {
                return None;
            }

            let total_impressions: u64 = group.pages.values().map(|a| a.impressions).sum();
            if total_impressions < options.min_impressions {
                return None;
            }

            let max_impressions = group.pages.values().map(|a| a.impressions).max().unwrap_or(0);
            let max_clicks = group.pages.values().map(|a| a.clicks).max().unwrap_or(0);
            let min_position = group
                .pages
                .values()
                .map(|a| a.mean_position())
                .filter(|p| *p > 0.0)
                .fold(f64::INFINITY, f64::min);

            let mut pages: Vec<PageMetric> = group
                .pages
                .into_iter()
                .map(|(page, acc)| {
                    let position = acc.mean_position();

                    let imp_term = if max_impressions == 0 {
                        0.0
                    } else {
                        acc.impressions as f64 / max_impressions as f64
                    };
                    let clk_term = if max_clicks == 0 {
                        0.0
                    } else {
                        acc.clicks as f64 / max_clicks as f64
                    };
                    let pos_term = if position > 0.0 && min_position.is_finite() {
                        min_position / position
                    } else {
                        0.0
                    };

                    let score = weights.impressions * imp_term
                        + weights.clicks * clk_term
                        + weights.position * pos_term;

                    PageMetric {
                        page,
                        clicks: acc.clicks,
                        impressions: acc.impressions,
                        ctr: acc.ctr(),
                        position,
                        score,
                    }
                })
                .collect();

            pages.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

            let primary = &pages[0];
            let rationale = format!(
                "{} pages competing. Primary has {} clicks, pos {:.1}",
                pages.len(),
                primary.clicks,
                primary.position
            );

            Some(CannibalCluster {
                query,
                primary_candidate: primary.page.clone(),
                rationale,
                total_impressions,
                page_count: pages.len(),
                pages,
            })
        })
        .collect();

    clusters.sort_by(|a, b| b.total_impressions.cmp(&a.total_impressions));

    debug!(
        rows = rows.len(),
        clusters = clusters.len(),
        min_pages = options.min_pages,
        min_impressions = options.min_impressions,
        "cannibalization detection complete"
    );

    clusters
}
