//! Batched, failure-isolated content extraction.
//!
//! For each of the first `trend_cap` trends, the scheduler splits the trend's
//! articles into batches and renders every article of a batch concurrently.
//! A batch is a fork-join group: all of its tasks settle (success, error or
//! timeout) before the next batch starts, and no task outlives its batch.
//! Between batches the scheduler pauses for `batch_delay` to stay under the
//! rate limits of the sites being fetched.
//!
//! Each task owns one render context. The context is closed exactly once on
//! every exit path, including a timeout, before the task counts as settled.
//! A failed article is marked `ExtractionFailed` and logged; its siblings are
//! unaffected and nothing is retried within the run.

use crate::error::RenderError;
use crate::models::{Article, ArticleState, RenderedPage, Trend};
use crate::render::{RenderContext, Renderer};
use crate::sources::SecondarySource;
use crate::utils::truncate_for_log;
use futures::future::join_all;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, error, info, instrument, warn};

/// Knobs for one extraction run.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How many trends (from the front of the sequence) are processed.
    pub trend_cap: usize,
    /// Articles per batch; `None` puts a whole trend in one batch.
    pub batch_size: Option<usize>,
    /// Deadline for opening a context and rendering one article.
    pub render_timeout: Duration,
    /// Pause between consecutive batches.
    pub batch_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            trend_cap: 3,
            batch_size: None,
            render_timeout: Duration::from_millis(12_000),
            batch_delay: Duration::from_millis(500),
        }
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub trends_processed: usize,
    pub trends_enriched: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl ExtractionSummary {
    /// Articles a render was started for.
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Drives the renderer over trend articles in rate-limited batches.
pub struct ExtractionScheduler<R, S> {
    renderer: R,
    lookup: S,
    config: SchedulerConfig,
}

impl<R, S> ExtractionScheduler<R, S>
where
    R: Renderer,
    S: SecondarySource,
{
    /// Create a scheduler.
    ///
    /// # Arguments
    ///
    /// * `renderer` - Opens one render context per article
    /// * `lookup` - Secondary source queried with each processed trend's title;
    ///   pass `None` to disable enrichment
    /// * `config` - Trend cap, batch size, render deadline and batch delay
    pub fn new(renderer: R, lookup: S, config: SchedulerConfig) -> Self {
        Self {
            renderer,
            lookup,
            config,
        }
    }

    /// Extract content for the articles of the first `trend_cap` trends.
    ///
    /// Trends past the cap are left untouched. Each processed trend is
    /// enriched once its last batch has settled.
    ///
    /// # Arguments
    ///
    /// * `trends` - Normalized trends, updated in place
    ///
    /// # Returns
    ///
    /// An [`ExtractionSummary`] with per-article success and failure counts.
    /// Never fails: render errors are recorded on the article they belong to.
    #[instrument(level = "info", skip_all, fields(trends = trends.len(), cap = self.config.trend_cap))]
    pub async fn run(&self, trends: &mut [Trend]) -> ExtractionSummary {
        let mut summary = ExtractionSummary::default();
        let mut batches_run = 0usize;

        for trend in trends.iter_mut().take(self.config.trend_cap) {
            info!(title = %trend.title, articles = trend.articles.len(), "Extracting content for trend");

            let batch_size = self
                .config
                .batch_size
                .filter(|&b| b > 0)
                .unwrap_or(trend.articles.len())
                .max(1);

            for batch in trend.articles.chunks_mut(batch_size) {
                if batches_run > 0 && !self.config.batch_delay.is_zero() {
                    sleep(self.config.batch_delay).await;
                }
                batches_run += 1;

                debug!(batch = batches_run, size = batch.len(), "Starting batch");
                let outcomes = join_all(batch.iter_mut().map(|a| self.extract_article(a))).await;
                let failed = outcomes.iter().filter(|o| o.is_err()).count();
                summary.succeeded += outcomes.len() - failed;
                summary.failed += failed;
                debug!(batch = batches_run, failed, "Batch settled");
            }

            if self.enrich(trend).await {
                summary.trends_enriched += 1;
            }
            summary.trends_processed += 1;
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            trends = summary.trends_processed,
            enriched = summary.trends_enriched,
            "Extraction complete"
        );
        summary
    }

    /// Render one article and record the outcome on it.
    async fn extract_article(&self, article: &mut Article) -> Result<(), RenderError> {
        match self.render_within_deadline(&article.source_url).await {
            Ok(page) => {
                apply_page(article, page);
                info!(url = %article.source_url, title = %article.title, "Extracted article");
                if let Some(content) = &article.content {
                    debug!(url = %article.source_url, preview = %truncate_for_log(content, 200), "Extracted content");
                }
                Ok(())
            }
            Err(e) => {
                error!(url = %article.source_url, host = ?article.source_host(), error = %e, "Failed to extract content");
                article.state = ArticleState::ExtractionFailed;
                Err(e)
            }
        }
    }

    async fn render_within_deadline(&self, url: &str) -> Result<RenderedPage, RenderError> {
        let timeout_ms = self.config.render_timeout.as_millis() as u64;
        let timed_out = || RenderError::Timeout {
            url: url.to_string(),
            timeout_ms,
        };
        let deadline = Instant::now() + self.config.render_timeout;

        let mut context = match timeout_at(deadline, self.renderer.open()).await {
            Ok(opened) => opened?,
            Err(_) => return Err(timed_out()),
        };
        let result = match timeout_at(deadline, context.render(url)).await {
            Ok(rendered) => rendered,
            Err(_) => Err(timed_out()),
        };
        context.close().await;
        result
    }

    /// Attach secondary-source content to `trend`. Returns whether anything was attached.
    async fn enrich(&self, trend: &mut Trend) -> bool {
        match self.lookup.lookup(&trend.title).await {
            Ok(entries) if !entries.is_empty() => {
                info!(title = %trend.title, entries = entries.len(), "Attached reference content");
                trend.reference = Some(entries);
                true
            }
            Ok(_) => {
                debug!(title = %trend.title, "No reference content found");
                false
            }
            Err(e) => {
                warn!(title = %trend.title, error = %e, "Reference lookup failed; continuing without it");
                false
            }
        }
    }
}

fn apply_page(article: &mut Article, page: RenderedPage) {
    if let Some(title) = page.title {
        article.title = title;
    }
    article.description = page.description;
    article.content = Some(page.content);
    article.markup = Some(page.markup);
    article.state = ArticleState::Extracted;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EnrichmentError;
    use crate::models::ReferenceEntry;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Probe {
        events: Arc<Mutex<Vec<(String, Instant)>>>,
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    impl Probe {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push((event, Instant::now()));
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().iter().map(|(e, _)| e.clone()).collect()
        }

        /// When `event` was recorded.
        fn at(&self, event: &str) -> Instant {
            self.events
                .lock()
                .unwrap()
                .iter()
                .find(|(e, _)| e == event)
                .map(|(_, t)| *t)
                .unwrap()
        }
    }

    #[derive(Clone, Default)]
    struct StubRenderer {
        probe: Probe,
        failing: HashSet<String>,
        hanging: HashSet<String>,
        fail_everything: bool,
        refuse_open: bool,
    }

    struct StubContext {
        renderer: StubRenderer,
        url: Option<String>,
    }

    impl Renderer for StubRenderer {
        type Context = StubContext;

        async fn open(&self) -> Result<StubContext, RenderError> {
            if self.refuse_open {
                return Err(RenderError::Launch("no browser".into()));
            }
            self.probe.opened.fetch_add(1, Ordering::SeqCst);
            Ok(StubContext {
                renderer: self.clone(),
                url: None,
            })
        }
    }

    impl RenderContext for StubContext {
        async fn render(&mut self, url: &str) -> Result<RenderedPage, RenderError> {
            self.url = Some(url.to_string());
            self.renderer.probe.push(format!("start:{url}"));
            if self.renderer.hanging.contains(url) {
                sleep(Duration::from_secs(30)).await;
            }
            sleep(Duration::from_millis(5)).await;
            self.renderer.probe.push(format!("end:{url}"));

            if self.renderer.fail_everything || self.renderer.failing.contains(url) {
                return Err(RenderError::Navigation {
                    url: url.to_string(),
                    message: "net::ERR_NAME_NOT_RESOLVED".into(),
                });
            }
            Ok(RenderedPage {
                title: Some(format!("Rendered {url}")),
                description: Some("desc".into()),
                content: "<p>body</p>".into(),
                markup: "<html><body><p>body</p></body></html>".into(),
            })
        }

        async fn close(self) {
            let url = self.url.unwrap_or_default();
            self.renderer.probe.push(format!("close:{url}"));
            self.renderer.probe.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct StubLookup {
        fail: bool,
    }

    impl SecondarySource for StubLookup {
        async fn lookup(&self, topic: &str) -> Result<Vec<ReferenceEntry>, EnrichmentError> {
            if self.fail {
                return Err(EnrichmentError::InvalidResponse("missing query".into()));
            }
            Ok(vec![ReferenceEntry {
                title: topic.to_string(),
                content: "Encyclopedic text".into(),
                categories: vec![],
                external_links: vec![],
            }])
        }
    }

    fn url(i: usize) -> String {
        format!("https://news.example.com/{i}")
    }

    fn trend_with(title: &str, n: usize) -> Trend {
        let articles = (0..n)
            .map(|i| Article::new(format!("a{i}"), format!("{}/{title}", url(i)), "1h ago", ""))
            .collect();
        Trend::new(title).with_articles(articles)
    }

    fn fast_config(batch_size: Option<usize>) -> SchedulerConfig {
        SchedulerConfig {
            trend_cap: 3,
            batch_size,
            render_timeout: Duration::from_millis(200),
            batch_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_are_separated_by_the_delay() {
        let delay = Duration::from_secs(10);
        let mut trends = vec![trend_with("t", 5)];
        let urls: Vec<String> = trends[0].articles.iter().map(|a| a.source_url.clone()).collect();
        let renderer = StubRenderer::default();
        let probe = renderer.probe.clone();
        let config = SchedulerConfig {
            batch_delay: delay,
            ..fast_config(Some(2))
        };

        let run_started = Instant::now();
        ExtractionScheduler::new(renderer, None::<StubLookup>, config)
            .run(&mut trends)
            .await;
        let run_finished = Instant::now();

        let batches: Vec<&[String]> = urls.chunks(2).collect();
        assert_eq!(batches.len(), 3);
        for pair in batches.windows(2) {
            let last_close = pair[0].iter().map(|u| probe.at(&format!("close:{u}"))).max().unwrap();
            let first_start = pair[1].iter().map(|u| probe.at(&format!("start:{u}"))).min().unwrap();
            assert!(first_start - last_close >= delay);
        }

        let first_start = batches[0].iter().map(|u| probe.at(&format!("start:{u}"))).min().unwrap();
        let last_close = batches[2].iter().map(|u| probe.at(&format!("close:{u}"))).max().unwrap();
        assert!(first_start - run_started < delay);
        assert!(run_finished - last_close < delay);
    }

    #[tokio::test]
    async fn test_only_the_failing_article_fails() {
        let mut trends = vec![trend_with("t", 7)];
        let failing_url = trends[0].articles[4].source_url.clone();
        let renderer = StubRenderer {
            failing: HashSet::from([failing_url.clone()]),
            ..Default::default()
        };
        let probe = renderer.probe.clone();

        let scheduler = ExtractionScheduler::new(renderer, None::<StubLookup>, fast_config(Some(3)));
        let summary = scheduler.run(&mut trends).await;

        assert_eq!(summary.succeeded, 6);
        assert_eq!(summary.failed, 1);
        for article in &trends[0].articles {
            if article.source_url == failing_url {
                assert_eq!(article.state, ArticleState::ExtractionFailed);
                assert!(article.content.is_none());
            } else {
                assert_eq!(article.state, ArticleState::Extracted);
                assert!(article.title.starts_with("Rendered "));
                assert_eq!(article.content.as_deref(), Some("<p>body</p>"));
            }
        }
        assert_eq!(probe.opened.load(Ordering::SeqCst), 7);
        assert_eq!(probe.closed.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_batches_do_not_overlap() {
        let mut trends = vec![trend_with("t", 8)];
        let batches: Vec<Vec<String>> = trends[0]
            .articles
            .chunks(3)
            .map(|c| c.iter().map(|a| a.source_url.clone()).collect())
            .collect();
        let renderer = StubRenderer {
            failing: HashSet::from([batches[0][1].clone()]),
            ..Default::default()
        };
        let probe = renderer.probe.clone();

        ExtractionScheduler::new(renderer, None::<StubLookup>, fast_config(Some(3)))
            .run(&mut trends)
            .await;

        let events = probe.events();
        let position = |event: &str| events.iter().position(|e| e == event).unwrap();
        for pair in batches.windows(2) {
            let last_close = pair[0].iter().map(|u| position(&format!("close:{u}"))).max().unwrap();
            let first_start = pair[1].iter().map(|u| position(&format!("start:{u}"))).min().unwrap();
            assert!(last_close < first_start, "next batch started before previous settled");
        }
    }

    #[tokio::test]
    async fn test_timeout_fails_article_and_closes_context_once() {
        let mut trends = vec![trend_with("t", 3)];
        let slow = trends[0].articles[1].source_url.clone();
        let renderer = StubRenderer {
            hanging: HashSet::from([slow.clone()]),
            ..Default::default()
        };
        let probe = renderer.probe.clone();

        let summary = ExtractionScheduler::new(renderer, None::<StubLookup>, fast_config(None))
            .run(&mut trends)
            .await;

        assert_eq!(summary.failed, 1);
        assert_eq!(trends[0].articles[1].state, ArticleState::ExtractionFailed);
        assert_eq!(trends[0].articles[0].state, ArticleState::Extracted);
        assert_eq!(trends[0].articles[2].state, ArticleState::Extracted);

        let events = probe.events();
        let closes = events.iter().filter(|e| **e == format!("close:{slow}")).count();
        assert_eq!(closes, 1);
        assert!(!events.contains(&format!("end:{slow}")));
        assert_eq!(probe.opened.load(Ordering::SeqCst), probe.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_renderer_that_always_fails_completes_run() {
        let mut trends = vec![trend_with("a", 2), trend_with("b", 3)];
        let renderer = StubRenderer {
            fail_everything: true,
            ..Default::default()
        };
        let probe = renderer.probe.clone();

        let summary = ExtractionScheduler::new(renderer, None::<StubLookup>, fast_config(Some(2)))
            .run(&mut trends)
            .await;

        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 5);
        assert_eq!(summary.attempted(), 5);
        assert!(trends
            .iter()
            .flat_map(|t| &t.articles)
            .all(|a| a.state == ArticleState::ExtractionFailed));
        assert_eq!(probe.closed.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_failed_open_has_nothing_to_close() {
        let mut trends = vec![trend_with("a", 2)];
        let renderer = StubRenderer {
            refuse_open: true,
            ..Default::default()
        };
        let probe = renderer.probe.clone();

        let summary = ExtractionScheduler::new(renderer, None::<StubLookup>, fast_config(None))
            .run(&mut trends)
            .await;

        assert_eq!(summary.failed, 2);
        assert_eq!(probe.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_trend_cap_leaves_later_trends_pending() {
        let mut trends = vec![trend_with("a", 1), trend_with("b", 1), trend_with("c", 2)];
        let mut config = fast_config(None);
        config.trend_cap = 2;

        let summary = ExtractionScheduler::new(StubRenderer::default(), None::<StubLookup>, config)
            .run(&mut trends)
            .await;

        assert_eq!(summary.trends_processed, 2);
        assert_eq!(summary.succeeded, 2);
        assert!(trends[2].articles.iter().all(|a| a.state == ArticleState::Pending));
    }

    #[tokio::test]
    async fn test_enrichment_attaches_reference() {
        let mut trends = vec![trend_with("Solar Eclipse", 1)];
        let summary = ExtractionScheduler::new(
            StubRenderer::default(),
            Some(StubLookup { fail: false }),
            fast_config(None),
        )
            .run(&mut trends)
            .await;

        assert_eq!(summary.trends_enriched, 1);
        let reference = trends[0].reference.as_ref().unwrap();
        assert_eq!(reference[0].title, "Solar Eclipse");
    }

    #[tokio::test]
    async fn test_enrichment_failure_does_not_fail_trend() {
        let mut trends = vec![trend_with("Solar Eclipse", 2)];
        let summary = ExtractionScheduler::new(
            StubRenderer::default(),
            Some(StubLookup { fail: true }),
            fast_config(None),
        )
            .run(&mut trends)
            .await;

        assert_eq!(summary.trends_enriched, 0);
        assert_eq!(summary.succeeded, 2);
        assert!(trends[0].reference.is_none());
    }

    #[tokio::test]
    async fn test_empty_trend_is_processed_without_batches() {
        let mut trends = vec![Trend::new("empty"), trend_with("b", 1)];
        let summary = ExtractionScheduler::new(StubRenderer::default(), None::<StubLookup>, fast_config(Some(4)))
            .run(&mut trends)
            .await;
        assert_eq!(summary.trends_processed, 2);
        assert_eq!(summary.succeeded, 1);
    }
}
