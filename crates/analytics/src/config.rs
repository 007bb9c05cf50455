//! Analytics thresholds and scoring weights — every tunable constant from the
//! clustering, anomaly, and scoring modules, exposed as one serde-typed YAML
//! document with built-in defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use serplens_core::{Result, SerplensError};

// ── Cannibalization ─────────────────────────────────────────────────

/// Blend weights for the per-page cannibalization score. Each term is
/// normalized against the best-performing page in the same query group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BlendWeights {
    /// Weight on impressions / max_impressions.
    #[serde(default = "default_weight_impressions")]
    pub impressions: f64,
    /// Weight on clicks / max_clicks.
    #[serde(default = "default_weight_clicks")]
    pub clicks: f64,
    /// Weight on min_position / position (rewards better rank).
    #[serde(default = "default_weight_position")]
    pub position: f64,
}

fn default_weight_impressions() -> f64 {
    0.5
}
fn default_weight_clicks() -> f64 {
    0.7
}
fn default_weight_position() -> f64 {
    0.6
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            impressions: default_weight_impressions(),
            clicks: default_weight_clicks(),
            position: default_weight_position(),
        }
    }
}

/// Thresholds for keeping a cannibalization cluster. Groups failing either
/// threshold are filtered out entirely, never returned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CannibalOptions {
    /// Minimum distinct pages competing for a query.
    #[serde(default = "default_min_pages")]
    pub min_pages: usize,
    /// Minimum summed impressions across the group.
    #[serde(default = "default_min_impressions")]
    pub min_impressions: u64,
    /// Score blend weights.
    #[serde(default)]
    pub blend: BlendWeights,
}

fn default_min_pages() -> usize {
    2
}
fn default_min_impressions() -> u64 {
    50
}

impl Default for CannibalOptions {
    fn default() -> Self {
        Self {
            min_pages: default_min_pages(),
            min_impressions: default_min_impressions(),
            blend: BlendWeights::default(),
        }
    }
}

// ── Anomaly detection ───────────────────────────────────────────────

/// Thresholds for period-over-period anomaly alerts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnomalyOptions {
    /// Fractional change magnitude that triggers an alert.
    #[serde(default = "default_anomaly_threshold")]
    pub threshold: f64,
    /// Change magnitude above which an alert is High severity (else Medium).
    #[serde(default = "default_high_severity")]
    pub high_severity: f64,
}

fn default_anomaly_threshold() -> f64 {
    0.3
}
fn default_high_severity() -> f64 {
    0.5
}

impl Default for AnomalyOptions {
    fn default() -> Self {
        Self {
            threshold: default_anomaly_threshold(),
            high_severity: default_high_severity(),
        }
    }
}

// ── Top-level document ──────────────────────────────────────────────

/// Full analytics configuration. Every field has a default matching the
/// shipped constants, so an empty document and `Default::default()` agree.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub cannibalization: CannibalOptions,
    #[serde(default)]
    pub anomaly: AnomalyOptions,
}

impl AnalyticsConfig {
    /// Parse a YAML document. Missing sections fall back to defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| SerplensError::Config(e.to_string()))
    }

    /// Load from a YAML file on disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }
}
