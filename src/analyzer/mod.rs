//! Structural analysis of extracted articles.
//!
//! The analyzer turns an article's rendered markup and readable content into
//! an [`AnalysisRecord`]. Every field extractor is total: a failing extractor
//! logs and yields an empty value, and never prevents the others from running.
//!
//! # Submodules
//!
//! - [`text`]: presentation stripping and canonical plain text
//! - [`metadata`]: `<title>` and `<meta>` values
//! - [`structured`]: JSON-LD parsing and deny-list sanitation
//! - [`keywords`]: keyword normalization
//! - [`embeds`]: social-media embeds
//! - [`structure`]: headings, links, questions and media
//!
//! # State handling
//!
//! | Incoming state | Content + markup | Result |
//! |----------------|------------------|--------|
//! | `Extracted` / `Analyzed` | present | new record, state `Analyzed` |
//! | `Extracted` | missing | unchanged, state `AnalysisSkipped` |
//! | anything else | any | returned untouched |

pub mod embeds;
pub mod keywords;
pub mod metadata;
pub mod structure;
pub mod structured;
pub mod text;

use crate::models::{AnalysisRecord, Article, ArticleState, Trend};
use scraper::Html;
use tracing::{debug, info, instrument};

/// Counts reported after analyzing a trend sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub analyzed: usize,
    pub skipped: usize,
    pub untouched: usize,
}

/// Builds [`AnalysisRecord`]s for extracted articles.
///
/// Stateless apart from its output option, so one analyzer can be reused for
/// a whole run and analysis of the same input always gives the same record.
#[derive(Debug, Clone, Default)]
pub struct ContentAnalyzer {
    /// Keep the full page markup on analyzed articles.
    retain_markup: bool,
}

impl ContentAnalyzer {
    /// Create an analyzer.
    ///
    /// # Arguments
    ///
    /// * `retain_markup` - Keep the full page markup on analyzed articles
    ///   instead of dropping it once the record is built
    pub fn new(retain_markup: bool) -> Self {
        Self { retain_markup }
    }

    /// Analyze one article.
    ///
    /// On success the article's `content` becomes the canonical plain text and
    /// its markup is dropped unless `retain_markup` is set.
    ///
    /// # Arguments
    ///
    /// * `article` - An article in any state
    ///
    /// # Returns
    ///
    /// The article in state `Analyzed` with a fresh record, `AnalysisSkipped`
    /// when an extracted article lacks content or markup, or unchanged when it
    /// was never extracted.
    pub fn analyze(&self, mut article: Article) -> Article {
        if !matches!(article.state, ArticleState::Extracted | ArticleState::Analyzed) {
            debug!(url = %article.source_url, state = ?article.state, "Passing article through");
            return article;
        }

        let (Some(content), Some(markup)) = (article.content.as_deref(), article.markup.as_deref())
        else {
            info!(title = %article.title, "No content found; skipping analysis");
            if article.state == ArticleState::Extracted {
                article.state = ArticleState::AnalysisSkipped;
            }
            return article;
        };

        debug!(title = %article.title, "Analyzing article");
        let (record, plain_text) = build_record(content, markup, &article.source_url);

        article.content = Some(plain_text);
        if !self.retain_markup {
            article.markup = None;
        }
        article.analysis = Some(record);
        article.state = ArticleState::Analyzed;
        article
    }

    /// Analyze every article of every trend and fold article keywords into the
    /// trend's related terms.
    #[instrument(level = "info", skip_all, fields(trends = trends.len()))]
    pub fn analyze_trends(&self, trends: &mut [Trend]) -> AnalysisSummary {
        let mut summary = AnalysisSummary::default();

        for trend in trends.iter_mut() {
            let articles = std::mem::take(&mut trend.articles);
            trend.articles = articles
                .into_iter()
                .map(|article| {
                    let before = article.state;
                    let analyzed = self.analyze(article);
                    match (before, analyzed.state) {
                        (_, ArticleState::AnalysisSkipped) => summary.skipped += 1,
                        (ArticleState::Extracted | ArticleState::Analyzed, ArticleState::Analyzed) => {
                            summary.analyzed += 1
                        }
                        _ => summary.untouched += 1,
                    }
                    analyzed
                })
                .collect();

            let article_keywords = trend
                .articles
                .iter()
                .filter_map(|a| a.analysis.as_ref())
                .flat_map(|record| record.keyword_set.iter().cloned());
            let merged: Vec<String> = trend
                .related_terms
                .iter()
                .cloned()
                .chain(article_keywords)
                .collect();
            trend.related_terms = keywords::normalize_keywords(merged);
        }

        info!(
            analyzed = summary.analyzed,
            skipped = summary.skipped,
            untouched = summary.untouched,
            "Analysis complete"
        );
        summary
    }
}

/// Build the record for one article. Returns the record and the canonical
/// plain text of `content`.
fn build_record(content: &str, markup: &str, article_url: &str) -> (AnalysisRecord, String) {
    let page = Html::parse_document(&text::strip_presentation(markup));
    let body = Html::parse_fragment(content);
    let plain_text = text::to_plain_text(content);

    let metadata = metadata::extract_metadata(&page);
    let structured_data = structured::extract_structured_data(&page);

    let raw_keywords = structured_data
        .as_ref()
        .map(structured::structured_keywords)
        .unwrap_or_default()
        .into_iter()
        .chain(metadata.keywords.iter().cloned());
    let keyword_set = keywords::normalize_keywords(raw_keywords);

    let record = AnalysisRecord {
        embeds: embeds::extract_embeds(&page),
        keyword_set,
        word_count: text::word_count(&plain_text),
        structure: structure::content_structure(&body),
        links: structure::link_census(&body, article_url),
        questions: structure::questions(&plain_text),
        media: structure::media_census(&body),
        metadata,
        structured_data,
    };
    (record, plain_text)
}
