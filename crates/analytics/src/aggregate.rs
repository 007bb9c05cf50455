//! Query→pages and page→queries groupings over raw search rows.
//!
//! Grouping uses `IndexMap` so that rows hitting the same key accumulate in
//! first-seen order; the final stable sorts then break ties by insertion
//! order, which downstream consumers rely on when iterating positionally.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use serplens_core::{PeriodDeltas, SearchRow};

/// One page's aggregated contribution to a query group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetric {
    pub page: String,
    pub clicks: u64,
    pub impressions: u64,
    /// clicks / impressions, 0 when impressions is 0.
    pub ctr: f64,
    /// Unweighted mean of this page's position samples.
    pub position: f64,
    /// Blended cannibalization score. 0 outside cluster detection.
    #[serde(default)]
    pub score: f64,
}

/// One query's aggregated contribution to a page group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetric {
    pub query: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

/// All pages serving a single query, with group-level totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAggregate {
    pub query: String,
    /// Sorted by clicks descending, ties in first-seen order.
    pub pages: Vec<PageMetric>,
    pub total_clicks: u64,
    pub total_impressions: u64,
    /// total_clicks / total_impressions, 0 when the denominator is 0.
    pub avg_ctr: f64,
    /// Unweighted mean of the per-page mean positions. Deliberately not
    /// impression-weighted; see `scoring::cannibalization_score` for the
    /// weighted variant.
    pub avg_position: f64,
    /// Copied verbatim from the first row of the group.
    #[serde(flatten)]
    pub deltas: PeriodDeltas,
}

/// All queries served by a single page, with page-level totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAggregate {
    pub page: String,
    /// Sorted by clicks descending, ties in first-seen order.
    pub queries: Vec<QueryMetric>,
    pub total_clicks: u64,
    pub total_impressions: u64,
    pub avg_ctr: f64,
    pub avg_position: f64,
}

/// Sums and position samples accumulated for one (query, page) pair.
#[derive(Debug, Clone, Default)]
pub(crate) struct MetricAccumulator {
    pub clicks: u64,
    pub impressions: u64,
    position_sum: f64,
    position_samples: u32,
}

impl MetricAccumulator {
    pub(crate) fn absorb(&mut self, row: &SearchRow) {
        self.clicks += row.clicks;
        self.impressions += row.impressions;
        self.position_sum += row.position;
        self.position_samples += 1;
    }

    /// Unweighted mean of observed positions. 0 when no samples.
    pub(crate) fn mean_position(&self) -> f64 {
        if self.position_samples == 0 {
            0.0
        } else {
            self.position_sum / self.position_samples as f64
        }
    }

    pub(crate) fn ctr(&self) -> f64 {
        if self.impressions == 0 {
            0.0
        } else {
            self.clicks as f64 / self.impressions as f64
        }
    }
}

/// One query group before conversion to its public aggregate form.
pub(crate) struct QueryGroup {
    pub deltas: PeriodDeltas,
    pub pages: IndexMap<String, MetricAccumulator>,
}

/// Group rows by normalized query, then by page within each group.
///
/// Rows with an empty query (after trim) or an empty page are silently
/// dropped. Shared by `group_by_query` and cluster detection so both see
/// identical groupings.
pub(crate) fn collect_query_groups(rows: &[SearchRow]) -> IndexMap<String, QueryGroup> {
    let mut groups: IndexMap<String, QueryGroup> = IndexMap::new();

    for row in rows {
        let query = row.normalized_query();
        let page = row.normalized_page();
        if query.is_empty() || page.is_empty() {
            continue;
        }

        let group = groups.entry(query).or_insert_with(|| QueryGroup {
            deltas: row.deltas,
            pages: IndexMap::new(),
        });
        group.pages.entry(page.to_owned()).or_default().absorb(row);
    }

    groups
}

/// Group rows by `query.to_lowercase().trim()`, building per-page metrics
/// within each group. Pages sort by clicks descending, groups by total
/// clicks descending. Empty input yields an empty Vec; never errors.
pub fn group_by_query(rows: &[SearchRow]) -> Vec<QueryAggregate> {
    let groups = collect_query_groups(rows);

    let mut out: Vec<QueryAggregate> = groups
        .into_iter()
        .map(|(query, group)| {
            let mut pages: Vec<PageMetric> = group
                .pages
                .into_iter()
                .map(|(page, acc)| PageMetric {
                    page,
                    clicks: acc.clicks,
                    impressions: acc.impressions,
                    ctr: acc.ctr(),
                    position: acc.mean_position(),
                    score: 0.0,
                })
                .collect();
            pages.sort_by(|a, b| b.clicks.cmp(&a.clicks));

            let total_clicks: u64 = pages.iter().map(|p| p.clicks).sum();
            let total_impressions: u64 = pages.iter().map(|p| p.impressions).sum();
            let avg_ctr = if total_impressions == 0 {
                0.0
            } else {
                total_clicks as f64 / total_impressions as f64
            };
            let avg_position = if pages.is_empty() {
                0.0
            } else {
                pages.iter().map(|p| p.position).sum::<f64>() / pages.len() as f64
            };

            QueryAggregate {
                query,
                pages,
                total_clicks,
                total_impressions,
                avg_ctr,
                avg_position,
                deltas: group.deltas,
            }
        })
        .collect();

    out.sort_by(|a, b| b.total_clicks.cmp(&a.total_clicks));

    debug!(rows = rows.len(), groups = out.len(), "grouped rows by query");
    out
}

/// Symmetric to `group_by_query` with page and query roles swapped. No delta
/// propagation. Sorted by total clicks descending.
pub fn group_by_page(rows: &[SearchRow]) -> Vec<PageAggregate> {
    let mut groups: IndexMap<String, IndexMap<String, MetricAccumulator>> = IndexMap::new();

    for row in rows {
        let query = row.normalized_query();
        let page = row.normalized_page();
        if query.is_empty() || page.is_empty() {
            continue;
        }

        groups
            .entry(page.to_owned())
            .or_default()
            .entry(query)
            .or_default()
            .absorb(row);
    }

    let mut out: Vec<PageAggregate> = groups
        .into_iter()
        .map(|(page, queries)| {
            let mut queries: Vec<QueryMetric> = queries
                .into_iter()
                .map(|(query, acc)| QueryMetric {
                    query,
                    clicks: acc.clicks,
                    impressions: acc.impressions,
                    ctr: acc.ctr(),
                    position: acc.mean_position(),
                })
                .collect();
            queries.sort_by(|a, b| b.clicks.cmp(&a.clicks));

            let total_clicks: u64 = queries.iter().map(|q| q.clicks).sum();
            let total_impressions: u64 = queries.iter().map(|q| q.impressions).sum();
            let avg_ctr = if total_impressions == 0 {
                0.0
            } else {
                total_clicks as f64 / total_impressions as f64
            };
            let avg_position = if queries.is_empty() {
                0.0
            } else {
                queries.iter().map(|q| q.position).sum::<f64>() / queries.len() as f64
            };

            PageAggregate {
                page,
                queries,
                total_clicks,
                total_impressions,
                avg_ctr,
                avg_position,
            }
        })
        .collect();

    out.sort_by(|a, b| b.total_clicks.cmp(&a.total_clicks));

    debug!(rows = rows.len(), groups = out.len(), "grouped rows by page");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serplens_core::PeriodDeltas;

    fn make_row(query: &str, page: &str, clicks: u64, impressions: u64, position: f64) -> SearchRow {
        SearchRow {
            query: query.to_owned(),
            page: page.to_owned(),
            clicks,
            impressions,
            position,
            country: None,
            device: None,
            date: None,
            deltas: PeriodDeltas::default(),
        }
    }

    #[test]
    fn empty_input_yields_empty() {
        assert!(group_by_query(&[]).is_empty());
        assert!(group_by_page(&[]).is_empty());
    }

    #[test]
    fn merges_case_and_whitespace_variants_of_query() {
        let rows = vec![
            make_row("SEO Tools", "/a", 10, 100, 3.0),
            make_row("  seo tools ", "/a", 5, 50, 5.0),
        ];
        let groups = group_by_query(&rows);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].query, "seo tools");
        assert_eq!(groups[0].pages.len(), 1);
        assert_eq!(groups[0].pages[0].clicks, 15);
        assert_eq!(groups[0].pages[0].impressions, 150);
        // Unweighted mean of the two position samples.
        assert!((groups[0].pages[0].position - 4.0).abs() < 1e-12);
    }

    #[test]
    fn drops_rows_missing_query_or_page() {
        let rows = vec![
            make_row("", "/a", 10, 100, 1.0),
            make_row("   ", "/a", 10, 100, 1.0),
            make_row("q", "", 10, 100, 1.0),
            make_row("q", "/a", 1, 10, 1.0),
        ];
        let groups = group_by_query(&rows);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].total_clicks, 1);

        let pages = group_by_page(&rows);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].total_clicks, 1);
    }

    #[test]
    fn partitions_input_exactly() {
        let rows = vec![
            make_row("a", "/1", 1, 10, 1.0),
            make_row("a", "/2", 2, 20, 2.0),
            make_row("b", "/1", 3, 30, 3.0),
            make_row("", "/1", 4, 40, 4.0),
        ];
        let by_query = group_by_query(&rows);
        let by_page = group_by_page(&rows);

        let query_clicks: u64 = by_query.iter().map(|g| g.total_clicks).sum();
        let page_clicks: u64 = by_page.iter().map(|g| g.total_clicks).sum();
        // Row with empty query excluded from both partitions.
        assert_eq!(query_clicks, 6);
        assert_eq!(page_clicks, 6);
    }

    #[test]
    fn avg_ctr_is_click_weighted_but_avg_position_is_not() {
        let rows = vec![
            make_row("q", "/a", 100, 1000, 2.0),
            make_row("q", "/b", 1, 10, 10.0),
        ];
        let groups = group_by_query(&rows);
        let g = &groups[0];
        assert!((g.avg_ctr - 101.0 / 1010.0).abs() < 1e-12);
        // avg_position averages per-page means, not weighted by impressions.
        assert!((g.avg_position - 6.0).abs() < 1e-12);
    }

    #[test]
    fn groups_sorted_by_total_clicks_descending() {
        let rows = vec![
            make_row("low", "/a", 1, 10, 1.0),
            make_row("high", "/a", 100, 10, 1.0),
            make_row("mid", "/a", 50, 10, 1.0),
        ];
        let groups = group_by_query(&rows);
        let order: Vec<&str> = groups.iter().map(|g| g.query.as_str()).collect();
        assert_eq!(order, vec!["high", "mid", "low"]);
    }

    #[test]
    fn equal_clicks_keep_insertion_order() {
        let rows = vec![
            make_row("q", "/first", 5, 10, 1.0),
            make_row("q", "/second", 5, 10, 1.0),
            make_row("q", "/third", 9, 10, 1.0),
        ];
        let groups = group_by_query(&rows);
        let order: Vec<&str> = groups[0].pages.iter().map(|p| p.page.as_str()).collect();
        assert_eq!(order, vec!["/third", "/first", "/second"]);
    }

    #[test]
    fn deltas_copied_from_first_row_of_group() {
        let mut first = make_row("q", "/a", 1, 10, 1.0);
        first.deltas.clicks_change = Some(-0.25);
        let mut second = make_row("q", "/b", 2, 10, 1.0);
        second.deltas.clicks_change = Some(0.9); // ignored: not first in group

        let groups = group_by_query(&[first, second]);
        assert_eq!(groups[0].deltas.clicks_change, Some(-0.25));
    }

    #[test]
    fn group_by_page_keeps_url_case_distinct() {
        let rows = vec![
            make_row("q", "/Pricing", 1, 10, 1.0),
            make_row("q", "/pricing", 2, 10, 1.0),
        ];
        let pages = group_by_page(&rows);
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn idempotent_over_same_input() {
        let rows = vec![
            make_row("a", "/1", 1, 10, 1.0),
            make_row("b", "/2", 2, 20, 2.0),
        ];
        assert_eq!(group_by_query(&rows), group_by_query(&rows));
        assert_eq!(group_by_page(&rows), group_by_page(&rows));
    }

    #[test]
    fn zero_impressions_ctr_is_zero() {
        let rows = vec![make_row("q", "/a", 0, 0, 1.0)];
        let groups = group_by_query(&rows);
        assert_eq!(groups[0].avg_ctr, 0.0);
        assert_eq!(groups[0].pages[0].ctr, 0.0);
    }
}
