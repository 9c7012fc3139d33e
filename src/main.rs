//! # Trend Digest
//!
//! A trend ingestion pipeline that collects trending search topics, renders
//! the news articles behind them, and reduces each article to a structured
//! analysis record ready for downstream summarization.
//!
//! ## Usage
//!
//! ```sh
//! trend_digest -c pipeline.yaml -o ./data
//! ```
//!
//! ## Architecture
//!
//! The application follows a staged pipeline, snapshotting the trend sequence
//! to JSON after each stage:
//! 1. **Fetching**: Pull raw trends for the configured window from Google daily trends
//! 2. **Normalizing**: Deduplicate trends and articles, order everything newest first
//! 3. **Extracting**: Render the articles of the top trends in rate-limited batches,
//!    then attach Wikipedia background to each processed trend
//! 4. **Analyzing**: Derive metadata, keywords, embeds, structure and media per article
//!
//! Only a trend source that yields nothing, an unreadable config or an
//! unwritable output directory stops the run. Every other failure is recorded
//! on the article or trend it belongs to.

use chrono::{Days, Utc};
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analyzer;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod recency;
mod render;
mod scheduler;
mod sources;
mod trends;
mod utils;

use analyzer::ContentAnalyzer;
use cli::Cli;
use config::PipelineConfig;
use outputs::json::{Snapshot, write_snapshot};
use render::HttpRenderer;
use scheduler::ExtractionScheduler;
use sources::TrendSource;
use sources::google_trends::GoogleTrendsClient;
use sources::wikipedia::WikipediaLookup;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("trend_digest starting up");

    let args = Cli::parse();
    debug!(?args.config, %args.output_dir, "Parsed CLI arguments");

    let mut config = PipelineConfig::load(args.config.as_deref()).await?;
    config.apply_overrides(&args);

    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Fetch and normalize trends ----
    let now = Utc::now();
    let end = now.date_naive();
    let start = end
        .checked_sub_days(Days::new(config.days_in_past))
        .unwrap_or(end);

    let source = GoogleTrendsClient::new(&config.geo, config.source_retries)?;
    let raw_trends = match source.fetch_raw_trends(start, end).await {
        Ok(trends) => trends,
        Err(e) => {
            error!(error = %e, "Trend source returned nothing; stopping");
            return Err(e.into());
        }
    };
    info!(raw = raw_trends.len(), "Fetched raw trends");

    let mut trends = trends::normalize(raw_trends, now);
    write_snapshot(&trends, &args.output_dir, Snapshot::Normalized).await?;

    // ---- Extract content ----
    let renderer = HttpRenderer::new(
        config.browserless_url.as_deref(),
        config.browserless_token.as_deref(),
        Duration::from_millis(config.render_timeout_ms),
    );
    let lookup = if config.enrichment {
        match WikipediaLookup::new(Duration::from_millis(config.enrichment_throttle_ms)) {
            Ok(lookup) => Some(lookup),
            Err(e) => {
                warn!(error = %e, "Could not build reference lookup; continuing without enrichment");
                None
            }
        }
    } else {
        info!("Enrichment disabled");
        None
    };

    let scheduler = ExtractionScheduler::new(renderer, lookup, config.scheduler_config());
    let extraction = scheduler.run(&mut trends).await;
    write_snapshot(&trends, &args.output_dir, Snapshot::Extracted).await?;

    // ---- Analyze ----
    let analyzer = ContentAnalyzer::new(config.retain_markup);
    let analysis = analyzer.analyze_trends(&mut trends);
    write_snapshot(&trends, &args.output_dir, Snapshot::Analyzed).await?;

    let elapsed = start_time.elapsed();
    info!(
        trends = trends.len(),
        processed = extraction.trends_processed,
        enriched = extraction.trends_enriched,
        attempted = extraction.attempted(),
        succeeded = extraction.succeeded,
        failed = extraction.failed,
        analyzed = analysis.analyzed,
        skipped = analysis.skipped,
        untouched = analysis.untouched,
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
