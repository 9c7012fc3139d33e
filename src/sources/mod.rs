//! External sources the pipeline reads from.
//!
//! Each source is a thin HTTP binding behind a narrow trait so the pipeline
//! stages can be exercised with in-memory stubs.
//!
//! | Source | Module | Trait | Failure handling |
//! |--------|--------|-------|------------------|
//! | Google daily trends | [`google_trends`] | [`TrendSource`] | per-day skip, hard stop when empty |
//! | Wikipedia | [`wikipedia`] | [`SecondarySource`] | skipped by the caller |
//!
//! [`retry`] wraps individual requests with exponential backoff.

pub mod google_trends;
pub mod retry;
pub mod wikipedia;

use crate::error::{EnrichmentError, TrendSourceError};
use crate::models::{ReferenceEntry, Trend};
use chrono::NaiveDate;

/// Upstream provider of raw, unnormalized trends.
pub trait TrendSource {
    /// Fetch every trend reported for the days `start..=end`.
    ///
    /// The result may contain duplicate titles across days.
    async fn fetch_raw_trends(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Trend>, TrendSourceError>;
}

/// Best-effort lookup of background material for a topic.
pub trait SecondarySource {
    /// Entries about `topic`; empty when nothing matched.
    async fn lookup(&self, topic: &str) -> Result<Vec<ReferenceEntry>, EnrichmentError>;
}

/// A disabled lookup (`None`) never finds anything.
impl<S: SecondarySource> SecondarySource for Option<S> {
    async fn lookup(&self, topic: &str) -> Result<Vec<ReferenceEntry>, EnrichmentError> {
        match self {
            Some(source) => source.lookup(topic).await,
            None => Ok(Vec::new()),
        }
    }
}
