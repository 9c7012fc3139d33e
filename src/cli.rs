//! Command-line interface definitions for Trend Digest.
//!
//! Every tuning flag is optional; when given it overrides the value from the
//! YAML config file (see [`crate::config::PipelineConfig`]).

use clap::Parser;

/// Command-line arguments for the Trend Digest pipeline.
///
/// # Examples
///
/// ```sh
/// # Defaults, snapshots written to ./data
/// trend_digest
///
/// # Config file plus overrides
/// trend_digest -c pipeline.yaml -o /tmp/trends --trend-cap 5 --batch-size 4
///
/// # Headless rendering through a Browserless instance
/// BROWSERLESS_URL=http://localhost:3000 trend_digest --no-enrichment
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML pipeline config
    #[arg(short, long)]
    pub config: Option<String>,

    /// Directory receiving the JSON snapshots
    #[arg(short, long, default_value = "data")]
    pub output_dir: String,

    /// Number of trends whose articles are extracted
    #[arg(long)]
    pub trend_cap: Option<usize>,

    /// Articles rendered concurrently per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Per-article render deadline in milliseconds
    #[arg(long)]
    pub render_timeout_ms: Option<u64>,

    /// Pause between batches in milliseconds
    #[arg(long)]
    pub batch_delay_ms: Option<u64>,

    /// Skip the Wikipedia lookup for processed trends
    #[arg(long)]
    pub no_enrichment: bool,

    /// Keep full page markup on analyzed articles
    #[arg(long)]
    pub retain_markup: bool,

    /// Base URL of a Browserless-compatible rendering service
    #[arg(long, env = "BROWSERLESS_URL")]
    pub browserless_url: Option<String>,

    /// Token for the rendering service
    #[arg(long, env = "BROWSERLESS_TOKEN")]
    pub browserless_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["trend_digest"]);

        assert_eq!(cli.output_dir, "data");
        assert!(cli.config.is_none());
        assert!(cli.trend_cap.is_none());
        assert!(!cli.no_enrichment);
        assert!(!cli.retain_markup);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["trend_digest", "-c", "/etc/pipeline.yaml", "-o", "/tmp/out"]);

        assert_eq!(cli.config.as_deref(), Some("/etc/pipeline.yaml"));
        assert_eq!(cli.output_dir, "/tmp/out");
    }

    #[test]
    fn test_cli_tuning_flags() {
        let cli = Cli::parse_from([
            "trend_digest",
            "--trend-cap",
            "5",
            "--batch-size",
            "4",
            "--render-timeout-ms",
            "8000",
            "--browserless-url",
            "http://localhost:3000",
        ]);

        assert_eq!(cli.trend_cap, Some(5));
        assert_eq!(cli.batch_size, Some(4));
        assert_eq!(cli.render_timeout_ms, Some(8000));
        assert_eq!(cli.browserless_url.as_deref(), Some("http://localhost:3000"));
    }
}
