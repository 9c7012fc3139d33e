//! JSON snapshots of the trend sequence.
//!
//! Each pipeline stage persists the whole sequence so a run can be inspected
//! (or resumed by hand) at any point. Files are pretty-printed and use the
//! camelCase field names of [`crate::models`].

use crate::models::Trend;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// The pipeline stage a snapshot was taken after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
    Normalized,
    Extracted,
    Analyzed,
}

impl Snapshot {
    pub fn file_name(self) -> &'static str {
        match self {
            Snapshot::Normalized => "trends.json",
            Snapshot::Extracted => "trendsWithContent.json",
            Snapshot::Analyzed => "trendsWithContentAndAnalysis.json",
        }
    }
}

/// Write `trends` to `{output_dir}/{snapshot file}` and return the path.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, snapshot = ?snapshot))]
pub async fn write_snapshot(
    trends: &[Trend],
    output_dir: &str,
    snapshot: Snapshot,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(trends)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(%output_dir, error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = Path::new(output_dir).join(snapshot.file_name());
    fs::write(&path, json).await?;
    info!(path = %path.display(), trends = trends.len(), "Wrote snapshot");

    Ok(path)
}
