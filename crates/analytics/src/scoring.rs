//! Pure numeric scoring helpers: expected CTR, opportunity sizing, keyword
//! value, authority, and normalization.
//!
//! Each function is a deterministic arithmetic expression over its inputs —
//! no hidden state, no errors. Malformed numeric input (NaN) propagates
//! rather than being rejected. Weight constants are heuristic and carry no
//! statistical derivation; they are named here so ports and tunings agree on
//! a single source.

use serde::{Deserialize, Serialize};

use crate::aggregate::PageMetric;

// ── Constants ───────────────────────────────────────────────────────

/// Baseline organic CTR by rounded position 1..=10. Positions beyond 10 fall
/// back to [`CTR_BEYOND_CURVE`].
pub const BASELINE_CTR_CURVE: [f64; 10] = [
    0.28, 0.15, 0.11, 0.08, 0.06, 0.05, 0.04, 0.035, 0.03, 0.025,
];

/// Baseline CTR for positions past the curve.
pub const CTR_BEYOND_CURVE: f64 = 0.02;

/// Floor and ceiling on the adjusted expected CTR.
pub const MIN_EXPECTED_CTR: f64 = 0.005;
pub const MAX_EXPECTED_CTR: f64 = 0.60;

/// SERP feature multipliers applied to the baseline curve.
pub const FEATURED_SNIPPET_MULTIPLIER: f64 = 1.20;
pub const PEOPLE_ALSO_ASK_MULTIPLIER: f64 = 0.94;
pub const HEAVY_ADS_MULTIPLIER: f64 = 0.85;
pub const SITELINKS_MULTIPLIER: f64 = 1.08;

/// Number of top-of-page ads at which [`HEAVY_ADS_MULTIPLIER`] kicks in.
pub const HEAVY_ADS_THRESHOLD: u32 = 3;

/// Search-intent multipliers for keyword value.
pub const COMMERCIAL_INTENT_MULTIPLIER: f64 = 1.0;
pub const NAVIGATIONAL_INTENT_MULTIPLIER: f64 = 0.7;
pub const INFORMATIONAL_INTENT_MULTIPLIER: f64 = 0.5;

/// Opportunity tier boundaries on potential extra clicks.
pub const OPPORTUNITY_HIGH_CLICKS: u64 = 100;
pub const OPPORTUNITY_MEDIUM_CLICKS: u64 = 20;

/// Priority score blend: potential clicks, keyword value, rank headroom.
pub const PRIORITY_WEIGHT_CLICKS: f64 = 0.4;
pub const PRIORITY_WEIGHT_VALUE: f64 = 0.4;
pub const PRIORITY_WEIGHT_POSITION: f64 = 0.2;
const PRIORITY_CLICKS_CEILING: f64 = 500.0;
const PRIORITY_VALUE_CEILING: f64 = 1000.0;
const PRIORITY_POSITION_CEILING: f64 = 100.0;

/// Link opportunity blend: target authority, topical fit, dofollow share.
pub const LINK_WEIGHT_AUTHORITY: f64 = 0.5;
pub const LINK_WEIGHT_OVERLAP: f64 = 0.3;
pub const LINK_WEIGHT_DOFOLLOW: f64 = 0.2;

/// Page authority blend and log-scale ceilings.
pub const AUTHORITY_WEIGHT_DOMAINS: f64 = 0.6;
pub const AUTHORITY_WEIGHT_BACKLINKS: f64 = 0.25;
pub const AUTHORITY_WEIGHT_DOFOLLOW: f64 = 0.15;
const AUTHORITY_DOMAINS_CEILING: f64 = 1_000_000.0;
const AUTHORITY_BACKLINKS_CEILING: f64 = 10_000_000.0;

// ── Inputs ──────────────────────────────────────────────────────────

/// SERP features observed for a keyword, adjusting the baseline CTR curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerpFeatures {
    pub featured_snippet: bool,
    pub people_also_ask: bool,
    /// Count of top-of-page ad slots.
    pub top_ads: u32,
    pub sitelinks: bool,
}

/// Coarse search intent classification for keyword valuation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchIntent {
    Commercial,
    Navigational,
    #[default]
    Informational,
}

impl SearchIntent {
    pub fn multiplier(self) -> f64 {
        match self {
            SearchIntent::Commercial => COMMERCIAL_INTENT_MULTIPLIER,
            SearchIntent::Navigational => NAVIGATIONAL_INTENT_MULTIPLIER,
            SearchIntent::Informational => INFORMATIONAL_INTENT_MULTIPLIER,
        }
    }
}

/// Opportunity tier from potential extra clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityTier {
    High,
    Medium,
    Low,
}

/// Result of a CTR gap calculation for one keyword/page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CtrGapOpportunity {
    pub expected_ctr: f64,
    /// max(0, expected - observed).
    pub gap: f64,
    /// round(impressions * gap).
    pub potential_extra_clicks: u64,
    pub tier: OpportunityTier,
}

// ── Functions ───────────────────────────────────────────────────────

/// Expected organic CTR at a position, adjusted for SERP features.
///
/// Positions below 1 clamp to 1; the curve is indexed by rounded position;
/// positions past 10 use [`CTR_BEYOND_CURVE`]. The adjusted result is
/// clamped to `[MIN_EXPECTED_CTR, MAX_EXPECTED_CTR]`.
pub fn expected_ctr(position: f64, features: &SerpFeatures) -> f64 {
    let rounded = position.round().max(1.0);
    let baseline = if rounded <= BASELINE_CTR_CURVE.len() as f64 {
        BASELINE_CTR_CURVE[rounded as usize - 1]
    } else {
        CTR_BEYOND_CURVE
    };

    let mut adjusted = baseline;
    if features.featured_snippet {
        adjusted *= FEATURED_SNIPPET_MULTIPLIER;
    }
    if features.people_also_ask {
        adjusted *= PEOPLE_ALSO_ASK_MULTIPLIER;
    }
    if features.top_ads >= HEAVY_ADS_THRESHOLD {
        adjusted *= HEAVY_ADS_MULTIPLIER;
    }
    if features.sitelinks {
        adjusted *= SITELINKS_MULTIPLIER;
    }

    adjusted.clamp(MIN_EXPECTED_CTR, MAX_EXPECTED_CTR)
}

/// Size the click upside of closing the gap between observed and expected CTR.
pub fn ctr_gap_opportunity(
    impressions: u64,
    observed_ctr: f64,
    position: f64,
    features: &SerpFeatures,
) -> CtrGapOpportunity {
    let expected = expected_ctr(position, features);
    let gap = (expected - observed_ctr).max(0.0);
    let potential_extra_clicks = (impressions as f64 * gap).round() as u64;

    let tier = if potential_extra_clicks > OPPORTUNITY_HIGH_CLICKS {
        OpportunityTier::High
    } else if potential_extra_clicks > OPPORTUNITY_MEDIUM_CLICKS {
        OpportunityTier::Medium
    } else {
        OpportunityTier::Low
    };

    CtrGapOpportunity {
        expected_ctr: expected,
        gap,
        potential_extra_clicks,
        tier,
    }
}

/// Monthly keyword value: volume * cpc * intent multiplier.
pub fn keyword_value(volume: u64, cpc: f64, intent: SearchIntent) -> f64 {
    volume as f64 * cpc * intent.multiplier()
}

/// Severity of position spread among pages competing for one query.
///
/// Impressions-weighted mean position, then impressions-weighted variance
/// around that mean; final score `(n - 1) * (1 + variance / 10)` rounded to
/// two decimals. Returns 0 for zero or one page, or when the group has no
/// impressions at all.
pub fn cannibalization_score(pages: &[PageMetric]) -> f64 {
    if pages.len() <= 1 {
        return 0.0;
    }

    let total_impressions: u64 = pages.iter().map(|p| p.impressions).sum();
    if total_impressions == 0 {
        return 0.0;
    }
    let total = total_impressions as f64;

    let weighted_mean = pages
        .iter()
        .map(|p| p.impressions as f64 * p.position)
        .sum::<f64>()
        / total;

    let variance = pages
        .iter()
        .map(|p| p.impressions as f64 * (p.position - weighted_mean).powi(2))
        .sum::<f64>()
        / total;

    let score = (pages.len() - 1) as f64 * (1.0 + variance / 10.0);
    (score * 100.0).round() / 100.0
}

/// Attractiveness of a backlink prospect, on a 0–100 scale.
///
/// Blends the prospect's authority (0–100), topical overlap with the target
/// page (0–1), and its share of dofollow outbound links (0–1), with the
/// `LINK_WEIGHT_*` constants. Rounded to one decimal.
pub fn link_opportunity_score(authority: f64, overlap: f64, dofollow_ratio: f64) -> f64 {
    let score = LINK_WEIGHT_AUTHORITY * normalize(authority, 0.0, 100.0)
        + LINK_WEIGHT_OVERLAP * overlap.clamp(0.0, 1.0)
        + LINK_WEIGHT_DOFOLLOW * dofollow_ratio.clamp(0.0, 1.0);
    ((score * 100.0) * 10.0).round() / 10.0
}

/// Overall action priority for a keyword opportunity, on a 0–100 scale.
///
/// Blends potential extra clicks (capped at 500), estimated keyword value
/// (capped at 1000), and rank headroom (worse current rank = more room to
/// gain), with the `PRIORITY_WEIGHT_*` constants. Rounded to one decimal.
pub fn priority_score(potential_extra_clicks: u64, value: f64, position: f64) -> f64 {
    let clicks_term = normalize(potential_extra_clicks as f64, 0.0, PRIORITY_CLICKS_CEILING);
    let value_term = normalize(value, 0.0, PRIORITY_VALUE_CEILING);
    let headroom_term = normalize(position, 1.0, PRIORITY_POSITION_CEILING);

    let score = PRIORITY_WEIGHT_CLICKS * clicks_term
        + PRIORITY_WEIGHT_VALUE * value_term
        + PRIORITY_WEIGHT_POSITION * headroom_term;
    ((score * 100.0) * 10.0).round() / 10.0
}

/// Jaccard similarity over lower-cased keyword sets. 0 when either side is
/// empty.
pub fn topical_overlap(a: &[String], b: &[String]) -> f64 {
    use std::collections::HashSet;

    let set_a: HashSet<String> = a.iter().map(|k| k.to_lowercase()).collect();
    let set_b: HashSet<String> = b.iter().map(|k| k.to_lowercase()).collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();

    intersection as f64 / union as f64
}

/// Page authority estimate on a 0–100 scale.
///
/// Log-scales referring-domain and backlink counts against fixed ceilings,
/// blends them with the dofollow ratio using the `AUTHORITY_WEIGHT_*`
/// constants. Rounded to one decimal.
pub fn page_authority(referring_domains: u64, backlinks: u64, dofollow_ratio: f64) -> f64 {
    let domains_term =
        (1.0 + referring_domains as f64).ln() / (1.0 + AUTHORITY_DOMAINS_CEILING).ln();
    let backlinks_term =
        (1.0 + backlinks as f64).ln() / (1.0 + AUTHORITY_BACKLINKS_CEILING).ln();

    let score = AUTHORITY_WEIGHT_DOMAINS * domains_term.min(1.0)
        + AUTHORITY_WEIGHT_BACKLINKS * backlinks_term.min(1.0)
        + AUTHORITY_WEIGHT_DOFOLLOW * dofollow_ratio.clamp(0.0, 1.0);
    ((score * 100.0) * 10.0).round() / 10.0
}

/// Monthly traffic value of ranking at `position` for a keyword: expected
/// baseline clicks priced at CPC. Rounded to two decimals.
pub fn estimate_traffic_value(volume: u64, position: f64, cpc: f64) -> f64 {
    let value = volume as f64 * expected_ctr(position, &SerpFeatures::default()) * cpc;
    (value * 100.0).round() / 100.0
}

/// Scale `value` into [0, 1] over `[min, max]`. 0 when the range is empty or
/// inverted.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: &str, impressions: u64, position: f64) -> PageMetric {
        PageMetric {
            page: page.to_owned(),
            clicks: 0,
            impressions,
            ctr: 0.0,
            position,
            score: 0.0,
        }
    }

    // ── expected_ctr ────────────────────────────────────────────────

    #[test]
    fn top_position_baseline() {
        assert_eq!(expected_ctr(1.0, &SerpFeatures::default()), 0.28);
    }

    #[test]
    fn featured_snippet_boost() {
        let features = SerpFeatures {
            featured_snippet: true,
            ..SerpFeatures::default()
        };
        assert!((expected_ctr(5.0, &features) - 0.072).abs() < 1e-12);
    }

    #[test]
    fn position_beyond_curve() {
        assert_eq!(expected_ctr(25.0, &SerpFeatures::default()), CTR_BEYOND_CURVE);
    }

    #[test]
    fn position_below_one_clamps_to_one() {
        assert_eq!(expected_ctr(0.0, &SerpFeatures::default()), 0.28);
        assert_eq!(expected_ctr(-3.0, &SerpFeatures::default()), 0.28);
    }

    #[test]
    fn fractional_position_rounds() {
        // 1.4 rounds to 1, 1.6 rounds to 2.
        assert_eq!(expected_ctr(1.4, &SerpFeatures::default()), 0.28);
        assert_eq!(expected_ctr(1.6, &SerpFeatures::default()), 0.15);
    }

    #[test]
    fn output_always_in_bounds() {
        let all_features = SerpFeatures {
            featured_snippet: true,
            people_also_ask: true,
            top_ads: 4,
            sitelinks: true,
        };
        for pos in [-10.0, 0.5, 1.0, 3.7, 10.0, 99.0, 1e9] {
            for f in [SerpFeatures::default(), all_features] {
                let ctr = expected_ctr(pos, &f);
                assert!((MIN_EXPECTED_CTR..=MAX_EXPECTED_CTR).contains(&ctr));
            }
        }
    }

    #[test]
    fn heavy_ads_penalty_needs_three_slots() {
        let two_ads = SerpFeatures { top_ads: 2, ..SerpFeatures::default() };
        let three_ads = SerpFeatures { top_ads: 3, ..SerpFeatures::default() };
        assert_eq!(expected_ctr(1.0, &two_ads), 0.28);
        assert!((expected_ctr(1.0, &three_ads) - 0.28 * 0.85).abs() < 1e-12);
    }

    // ── ctr_gap_opportunity ─────────────────────────────────────────

    #[test]
    fn high_tier_gap() {
        // Expected at pos 1 = 0.28, observed 0.05 -> gap 0.23 over 1000
        // impressions = 230 extra clicks.
        let opp = ctr_gap_opportunity(1000, 0.05, 1.0, &SerpFeatures::default());
        assert_eq!(opp.potential_extra_clicks, 230);
        assert_eq!(opp.tier, OpportunityTier::High);
    }

    #[test]
    fn medium_and_low_tiers() {
        let medium = ctr_gap_opportunity(200, 0.05, 1.0, &SerpFeatures::default());
        assert_eq!(medium.potential_extra_clicks, 46);
        assert_eq!(medium.tier, OpportunityTier::Medium);

        let low = ctr_gap_opportunity(50, 0.05, 1.0, &SerpFeatures::default());
        assert_eq!(low.tier, OpportunityTier::Low);
    }

    #[test]
    fn overperforming_page_has_zero_gap() {
        let opp = ctr_gap_opportunity(1000, 0.50, 1.0, &SerpFeatures::default());
        assert_eq!(opp.gap, 0.0);
        assert_eq!(opp.potential_extra_clicks, 0);
        assert_eq!(opp.tier, OpportunityTier::Low);
    }

    // ── keyword_value ───────────────────────────────────────────────

    #[test]
    fn intent_multipliers() {
        assert_eq!(keyword_value(1000, 2.0, SearchIntent::Commercial), 2000.0);
        assert!((keyword_value(1000, 2.0, SearchIntent::Navigational) - 1400.0).abs() < 1e-9);
        assert_eq!(keyword_value(1000, 2.0, SearchIntent::Informational), 1000.0);
    }

    #[test]
    fn default_intent_is_informational() {
        assert_eq!(SearchIntent::default(), SearchIntent::Informational);
    }

    // ── cannibalization_score ───────────────────────────────────────

    #[test]
    fn single_page_scores_zero() {
        assert_eq!(cannibalization_score(&[page("/a", 1000, 3.0)]), 0.0);
        assert_eq!(cannibalization_score(&[]), 0.0);
    }

    #[test]
    fn identical_positions_score_page_count_only() {
        // Variance 0 -> score = (n - 1) * 1.
        let pages = vec![page("/a", 500, 4.0), page("/b", 500, 4.0), page("/c", 500, 4.0)];
        assert_eq!(cannibalization_score(&pages), 2.0);
    }

    #[test]
    fn spread_positions_score_higher() {
        let tight = vec![page("/a", 500, 3.0), page("/b", 500, 4.0)];
        let spread = vec![page("/a", 500, 2.0), page("/b", 500, 12.0)];
        assert!(cannibalization_score(&spread) > cannibalization_score(&tight));
    }

    #[test]
    fn weighted_variance_uses_impressions() {
        // Mean dominated by the heavy page; variance mostly from the light one.
        // mean = (900*2 + 100*12)/1000 = 3.0
        // var  = (900*1 + 100*81)/1000 = 9.0 -> score = 1 * (1 + 0.9) = 1.9
        let pages = vec![page("/a", 900, 2.0), page("/b", 100, 12.0)];
        assert_eq!(cannibalization_score(&pages), 1.9);
    }

    #[test]
    fn zero_impression_group_scores_zero() {
        let pages = vec![page("/a", 0, 2.0), page("/b", 0, 9.0)];
        assert_eq!(cannibalization_score(&pages), 0.0);
    }

    // ── topical_overlap ─────────────────────────────────────────────

    #[test]
    fn empty_side_is_zero() {
        assert_eq!(topical_overlap(&[], &["x".to_owned()]), 0.0);
        assert_eq!(topical_overlap(&[], &[]), 0.0);
    }

    #[test]
    fn jaccard_basics() {
        let a = vec!["seo".to_owned(), "tools".to_owned()];
        let b = vec!["SEO".to_owned(), "audit".to_owned()];
        // Intersection {seo}, union {seo, tools, audit}.
        assert!((topical_overlap(&a, &b) - 1.0 / 3.0).abs() < 1e-12);

        let same = vec!["Rank".to_owned(), "tracker".to_owned()];
        assert_eq!(topical_overlap(&same, &same), 1.0);
    }

    // ── authority / link / priority / value ─────────────────────────

    #[test]
    fn page_authority_monotonic_in_domains() {
        let low = page_authority(10, 100, 0.5);
        let high = page_authority(10_000, 100, 0.5);
        assert!(high > low);
        assert!((0.0..=100.0).contains(&low));
        assert!((0.0..=100.0).contains(&high));
    }

    #[test]
    fn page_authority_zero_inputs() {
        assert_eq!(page_authority(0, 0, 0.0), 0.0);
    }

    #[test]
    fn link_opportunity_bounds() {
        assert_eq!(link_opportunity_score(0.0, 0.0, 0.0), 0.0);
        assert_eq!(link_opportunity_score(100.0, 1.0, 1.0), 100.0);
        let mid = link_opportunity_score(50.0, 0.5, 0.5);
        assert!(mid > 0.0 && mid < 100.0);
    }

    #[test]
    fn priority_score_orders_opportunities() {
        let small = priority_score(10, 50.0, 2.0);
        let large = priority_score(400, 800.0, 15.0);
        assert!(large > small);
        assert!((0.0..=100.0).contains(&large));
    }

    #[test]
    fn priority_score_saturates_at_ceilings() {
        assert_eq!(priority_score(10_000, 1e9, 500.0), 100.0);
    }

    #[test]
    fn traffic_value_prices_expected_clicks() {
        // 1000 * 0.28 * 1.5 = 420.
        assert_eq!(estimate_traffic_value(1000, 1.0, 1.5), 420.0);
    }

    // ── normalize ───────────────────────────────────────────────────

    #[test]
    fn normalize_basics() {
        assert_eq!(normalize(5.0, 0.0, 10.0), 0.5);
        assert_eq!(normalize(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(normalize(20.0, 0.0, 10.0), 1.0);
        assert_eq!(normalize(1.0, 3.0, 3.0), 0.0);
        assert_eq!(normalize(1.0, 5.0, 2.0), 0.0);
    }
}
