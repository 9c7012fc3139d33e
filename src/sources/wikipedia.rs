//! Wikipedia background lookup for trend topics.
//!
//! Searches English Wikipedia for the topic, parses the top pages, strips CSS
//! from their HTML and converts it to Markdown.

use super::SecondarySource;
use crate::analyzer::text::strip_css;
use crate::error::EnrichmentError;
use crate::models::ReferenceEntry;
use futures::future::join_all;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument};

const API_URL: &str = "https://en.wikipedia.org/w/api.php";
const SEARCH_LIMIT: usize = 5;
const PAGES_PER_TOPIC: usize = 3;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    pageid: u64,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: Option<ParsedPage>,
}

#[derive(Debug, Deserialize)]
struct ParsedPage {
    title: String,
    text: Starred,
    #[serde(default)]
    categories: Vec<Starred>,
    #[serde(default)]
    externallinks: Vec<String>,
}

/// Wikipedia's legacy JSON format keeps values under a `"*"` key.
#[derive(Debug, Deserialize)]
struct Starred {
    #[serde(rename = "*")]
    value: String,
}

/// [`SecondarySource`] backed by the MediaWiki API.
#[derive(Debug, Clone)]
pub struct WikipediaLookup {
    client: reqwest::Client,
    api_url: String,
    throttle: Duration,
}

impl WikipediaLookup {
    /// Lookup against English Wikipedia, pausing `throttle` before each topic.
    pub fn new(throttle: Duration) -> Result<Self, EnrichmentError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("trend_digest/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            client,
            api_url: API_URL.to_string(),
            throttle,
        })
    }

    async fn search(&self, topic: &str) -> Result<Vec<u64>, EnrichmentError> {
        let url = format!(
            "{}?action=query&format=json&list=search&srsearch={}&srlimit={}",
            self.api_url,
            urlencoding::encode(topic),
            SEARCH_LIMIT
        );
        let resp: SearchResponse = self.client.get(url).send().await?.json().await?;
        let query = resp
            .query
            .ok_or_else(|| EnrichmentError::InvalidResponse("search without query".into()))?;
        Ok(query.search.into_iter().map(|hit| hit.pageid).collect())
    }

    async fn page(&self, pageid: u64) -> Result<ReferenceEntry, EnrichmentError> {
        let url = format!(
            "{}?action=parse&prop=text|categories|externallinks&redirects=true&format=json&pageid={}",
            self.api_url, pageid
        );
        let resp: ParseResponse = self.client.get(url).send().await?.json().await?;
        let page = resp
            .parse
            .ok_or_else(|| EnrichmentError::InvalidResponse(format!("page {pageid} not parsed")))?;
        reference_entry(page)
    }
}

fn reference_entry(page: ParsedPage) -> Result<ReferenceEntry, EnrichmentError> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "sup", "img"])
        .build();
    let markdown = converter
        .convert(&strip_css(&page.text.value))
        .map_err(|e| EnrichmentError::InvalidResponse(format!("markdown conversion failed: {e}")))?;

    Ok(ReferenceEntry {
        title: page.title,
        content: markdown.trim().to_string(),
        categories: page.categories.into_iter().map(|c| c.value).collect(),
        external_links: page.externallinks,
    })
}

impl SecondarySource for WikipediaLookup {
    #[instrument(level = "info", skip_all, fields(%topic))]
    async fn lookup(&self, topic: &str) -> Result<Vec<ReferenceEntry>, EnrichmentError> {
        if topic.trim().chars().count() < 2 {
            debug!("Topic too short for lookup");
            return Ok(Vec::new());
        }
        sleep(self.throttle).await;

        let pageids = self.search(topic).await?;
        let pages = join_all(
            pageids
                .into_iter()
                .take(PAGES_PER_TOPIC)
                .map(|id| self.page(id)),
        )
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

        info!(count = pages.len(), "Fetched reference pages");
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_decodes_starred_fields() {
        let json = r#"{"parse":{"title":"Solar eclipse","pageid":1,
            "text":{"*":"<div class=\"mw-parser-output\"><p style=\"x\">A <b>solar eclipse</b> occurs.</p></div>"},
            "categories":[{"sortkey":"","*":"Eclipses"}],
            "externallinks":["https://nasa.gov"]}}"#;
        let resp: ParseResponse = serde_json::from_str(json).unwrap();
        let entry = reference_entry(resp.parse.unwrap()).unwrap();

        assert_eq!(entry.title, "Solar eclipse");
        assert!(entry.content.contains("solar eclipse"));
        assert!(!entry.content.contains("<p"));
        assert!(!entry.content.contains("mw-parser-output"));
        assert_eq!(entry.categories, vec!["Eclipses"]);
        assert_eq!(entry.external_links, vec!["https://nasa.gov"]);
    }

    #[test]
    fn test_search_response_without_query() {
        let resp: SearchResponse = serde_json::from_str(r#"{"error":{"code":"x"}}"#).unwrap();
        assert!(resp.query.is_none());
    }

    #[tokio::test]
    async fn test_short_topic_returns_nothing_without_network() {
        let lookup = WikipediaLookup::new(Duration::from_secs(60)).unwrap();
        assert!(lookup.lookup("x").await.unwrap().is_empty());
    }
}
