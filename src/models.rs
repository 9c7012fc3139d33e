//! Data models for trends, their articles, and the analysis derived from them.
//!
//! This module defines the records that flow through every pipeline stage:
//! - [`Trend`]: A trending topic with its related terms and articles
//! - [`Article`]: One news article attached to a trend, with its lifecycle state
//! - [`AnalysisRecord`]: Structured output of the content analyzer
//!
//! Field names serialize as camelCase so snapshots written between stages keep
//! the same shape the downstream consumer reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A trending topic for one fetch window.
///
/// The `title` is the identity key: no two trends in a normalized sequence
/// share it, and it is never changed after creation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    /// The search query that is trending.
    pub title: String,
    /// Related queries and keywords, deduplicated, first occurrence wins.
    #[serde(default)]
    pub related_terms: Vec<String>,
    /// Articles covering the trend, newest first once normalized.
    #[serde(default)]
    pub articles: Vec<Article>,
    /// Auxiliary content from the secondary-source lookup, if any was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Vec<ReferenceEntry>>,
}

impl Trend {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            related_terms: Vec::new(),
            articles: Vec::new(),
            reference: None,
        }
    }

    pub fn with_articles(mut self, articles: Vec<Article>) -> Self {
        self.articles = articles;
        self
    }
}

/// Lifecycle of an article through one pipeline run.
///
/// ```text
/// Pending -> Extracted -> Analyzed
///                      \-> AnalysisSkipped
/// Pending -> ExtractionFailed
/// ```
///
/// `ExtractionFailed` is terminal for the run: failed articles are kept in
/// the output so consumers can tell "no content" from "not attempted".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum ArticleState {
    #[default]
    Pending,
    Extracted,
    ExtractionFailed,
    Analyzed,
    AnalysisSkipped,
}

/// A single article attached to a trend.
///
/// `relative_age` is the raw "2h ago" style string from the trend source. It
/// is resolved to an instant only for ordering and is never overwritten.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Headline; replaced by the rendered page title after extraction.
    pub title: String,
    /// Article URL, unique within the owning trend.
    pub source_url: String,
    /// Raw relative publication age, e.g. `"3h ago"`.
    pub relative_age: String,
    /// Teaser text from the trend source.
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub state: ArticleState,
    /// Page description captured by the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Readable article body: markup after extraction, plain text after analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Full rendered page markup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisRecord>,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        source_url: impl Into<String>,
        relative_age: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
            relative_age: relative_age.into(),
            snippet: snippet.into(),
            state: ArticleState::Pending,
            description: None,
            content: None,
            markup: None,
            analysis: None,
        }
    }

    /// Host name of the article URL, e.g. `"www.cnn.com"`.
    pub fn source_host(&self) -> Option<String> {
        url::Url::parse(&self.source_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

/// Page returned by a renderer for one article URL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedPage {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Readable article body as markup.
    pub content: String,
    /// Complete page markup.
    pub markup: String,
}

/// Auxiliary content found by the secondary-source lookup.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntry {
    pub title: String,
    /// Page body converted to Markdown.
    pub content: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub external_links: Vec<String>,
}

/// Structured analysis of one extracted article.
///
/// Derived deterministically from the article markup and content. Records are
/// never edited; analyzing again produces a new record.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub metadata: PageMetadata,
    /// JSON-LD payload with boilerplate fields removed; `None` when absent,
    /// malformed, or empty after stripping.
    pub structured_data: Option<Value>,
    /// Social embeds keyed by platform name.
    pub embeds: BTreeMap<String, Vec<EmbedDescriptor>>,
    /// Normalized, title-cased keywords.
    pub keyword_set: Vec<String>,
    pub word_count: usize,
    pub structure: ContentStructure,
    pub links: LinkCensus,
    pub questions: Vec<String>,
    pub media: MediaCensus,
}

/// Values read from `<title>` and `<meta>` tags.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
}

/// A social-media embed found in the page.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EmbedDescriptor {
    /// Source URL of the embed, when it is an iframe.
    pub src: Option<String>,
    /// Outer markup of the embed element.
    pub html: String,
}

/// Heading outline and block counts of the article body.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStructure {
    /// Heading texts keyed by level, `"H1"` through `"H6"`.
    pub headings: BTreeMap<String, Vec<String>>,
    pub paragraph_count: usize,
    pub list_count: usize,
    pub table_count: usize,
}

/// Links in the article body split by whether they stay on the article host.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct LinkCensus {
    pub internal: Vec<String>,
    pub external: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct MediaCensus {
    pub images: Vec<ImageRef>,
    pub videos: Vec<VideoRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageRef {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VideoRef {
    pub src: String,
    pub poster: String,
}
