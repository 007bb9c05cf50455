//! serplens — run search-analytics aggregation over exported row files.
//!
//! Input is a JSON array of search rows (query/page/clicks/impressions/
//! position, optionally country/device/date and period deltas), as produced
//! by a Search Console export. Output is JSON on stdout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use serplens_analytics::{
    build_report, detect_anomalies, find_cannibal_clusters, group_by_page, group_by_query,
    AnalyticsConfig,
};
use serplens_core::{config::load_dotenv, Config, SearchRow};

#[derive(Parser, Debug)]
#[command(name = "serplens", version, about = "Search-analytics aggregation and cannibalization detection")]
struct Cli {
    /// Path to an analytics YAML config overriding built-in thresholds.
    #[arg(long, env = "SERPLENS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Group rows by query, with per-page breakdowns.
    Queries {
        /// JSON file containing an array of search rows.
        input: PathBuf,
    },
    /// Group rows by page, with per-query breakdowns.
    Pages {
        input: PathBuf,
    },
    /// Detect queries served by multiple competing pages.
    Cannibalization {
        input: PathBuf,
        /// Minimum competing pages per cluster.
        #[arg(long)]
        min_pages: Option<usize>,
        /// Minimum summed impressions per cluster.
        #[arg(long)]
        min_impressions: Option<u64>,
    },
    /// Compare two periods and emit drop alerts.
    Anomalies {
        /// Current-period rows.
        input: PathBuf,
        /// Previous-period rows.
        #[arg(long)]
        previous: PathBuf,
        /// Fractional change magnitude that triggers an alert.
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Full report: groupings, clusters, opportunities, and (optionally) alerts.
    Report {
        input: PathBuf,
        /// Previous-period rows, enabling anomaly alerts.
        #[arg(long)]
        previous: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    load_dotenv();
    let runtime = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(runtime.log.filter.clone())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    runtime.log_summary();

    let cli = Cli::parse();
    let config = load_analytics_config(cli.config.as_deref().or(runtime.analytics_config.as_deref()))?;

    match cli.command {
        Command::Queries { input } => {
            let rows = load_rows(&input)?;
            print_json(&group_by_query(&rows), cli.pretty)
        }
        Command::Pages { input } => {
            let rows = load_rows(&input)?;
            print_json(&group_by_page(&rows), cli.pretty)
        }
        Command::Cannibalization {
            input,
            min_pages,
            min_impressions,
        } => {
            let rows = load_rows(&input)?;
            let mut options = config.cannibalization;
            if let Some(n) = min_pages {
                options.min_pages = n;
            }
            if let Some(n) = min_impressions {
                options.min_impressions = n;
            }
            print_json(&find_cannibal_clusters(&rows, &options), cli.pretty)
        }
        Command::Anomalies {
            input,
            previous,
            threshold,
        } => {
            let current = load_rows(&input)?;
            let prev = load_rows(&previous)?;
            let mut options = config.anomaly;
            if let Some(t) = threshold {
                options.threshold = t;
            }
            print_json(&detect_anomalies(&current, &prev, &options), cli.pretty)
        }
        Command::Report { input, previous } => {
            let current = load_rows(&input)?;
            let prev = previous.map(|p| load_rows(&p)).transpose()?;
            print_json(&build_report(&current, prev.as_deref(), &config), cli.pretty)
        }
    }
}

fn load_analytics_config(path: Option<&Path>) -> Result<AnalyticsConfig> {
    match path {
        Some(p) => {
            let cfg = AnalyticsConfig::load_from_path(p)
                .with_context(|| format!("failed to load analytics config '{}'", p.display()))?;
            info!(path = %p.display(), "loaded analytics config");
            Ok(cfg)
        }
        None => Ok(AnalyticsConfig::default()),
    }
}

fn load_rows(path: &Path) -> Result<Vec<SearchRow>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rows file '{}'", path.display()))?;
    let rows: Vec<SearchRow> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse rows file '{}'", path.display()))?;
    info!(rows = rows.len(), path = %path.display(), "loaded rows");
    Ok(rows)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}
