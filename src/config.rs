//! Pipeline configuration.
//!
//! Settings come from an optional YAML file; every field has a default so an
//! empty file (or no file at all) yields a working configuration. Command-line
//! flags are applied on top with [`PipelineConfig::apply_overrides`].
//!
//! ```yaml
//! days_in_past: 1
//! geo: US
//! trend_cap: 3
//! batch_size: 4
//! render_timeout_ms: 12000
//! batch_delay_ms: 500
//! browserless_url: http://localhost:3000
//! enrichment: true
//! enrichment_throttle_ms: 1000
//! retain_markup: false
//! source_retries: 3
//! ```

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::scheduler::SchedulerConfig;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Days before today included in the trend window (today is always included).
    pub days_in_past: u64,
    /// Region code passed to the trend source.
    pub geo: String,
    pub trend_cap: usize,
    pub batch_size: Option<usize>,
    pub render_timeout_ms: u64,
    pub batch_delay_ms: u64,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    /// Look up background material for each processed trend.
    pub enrichment: bool,
    pub enrichment_throttle_ms: u64,
    pub retain_markup: bool,
    /// Retries per trend-source request after the first attempt.
    pub source_retries: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            days_in_past: 1,
            geo: "US".to_string(),
            trend_cap: 3,
            batch_size: None,
            render_timeout_ms: 12_000,
            batch_delay_ms: 500,
            browserless_url: None,
            browserless_token: None,
            enrichment: true,
            enrichment_throttle_ms: 1_000,
            retain_markup: false,
            source_retries: 3,
        }
    }
}

impl PipelineConfig {
    /// Load from `path`, or return the defaults when no path is given.
    #[instrument(level = "info", skip_all, fields(path = ?path))]
    pub async fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;
        let config = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        info!(?config, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to an empty mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Flags given on the command line win over the file.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(cap) = cli.trend_cap {
            self.trend_cap = cap;
        }
        if let Some(size) = cli.batch_size {
            self.batch_size = Some(size);
        }
        if let Some(ms) = cli.render_timeout_ms {
            self.render_timeout_ms = ms;
        }
        if let Some(ms) = cli.batch_delay_ms {
            self.batch_delay_ms = ms;
        }
        if cli.no_enrichment {
            self.enrichment = false;
        }
        if cli.retain_markup {
            self.retain_markup = true;
        }
        if let Some(url) = &cli.browserless_url {
            self.browserless_url = Some(url.clone());
        }
        if let Some(token) = &cli.browserless_token {
            self.browserless_token = Some(token.clone());
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            trend_cap: self.trend_cap,
            batch_size: self.batch_size,
            render_timeout: Duration::from_millis(self.render_timeout_ms),
            batch_delay: Duration::from_millis(self.batch_delay_ms),
        }
    }
}
