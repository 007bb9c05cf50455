use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

// ── Top-level config ──────────────────────────────────────────

/// Runtime configuration for the binary layer. The analytics thresholds
/// themselves live in `serplens-analytics` as a typed YAML document; this
/// only covers where to find it and how to log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub log: LogConfig,
    /// Optional path to an analytics YAML config overriding built-in defaults.
    pub analytics_config: Option<PathBuf>,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            log: LogConfig::from_env(),
            analytics_config: env_opt("SERPLENS_CONFIG").map(PathBuf::from),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::debug!("Config loaded:");
        tracing::debug!("  log:       filter={}", self.log.filter);
        tracing::debug!(
            "  analytics: config={}",
            self.analytics_config
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built-in defaults)".to_string())
        );
    }
}

// ── Logging ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default tracing filter when RUST_LOG is unset.
    pub filter: String,
}

impl LogConfig {
    fn from_env() -> Self {
        Self {
            filter: env_or("SERPLENS_LOG", "warn"),
        }
    }
}
