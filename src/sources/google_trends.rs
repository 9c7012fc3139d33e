//! Google daily-trends client.
//!
//! Fetches one day of trending searches per request from the public
//! `dailytrends` endpoint. Responses carry an anti-XSSI prefix (`)]}',`) that
//! is removed before decoding.
//!
//! # Failure handling
//!
//! A day that still fails after retries is logged and skipped. Only a window
//! in which no day produced any trend is an error
//! ([`TrendSourceError::Exhausted`]), since there is nothing left to process.

use super::TrendSource;
use super::retry::{FetchAsync, RetryFetch};
use crate::error::TrendSourceError;
use crate::models::{Article, Trend};
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};

const DAILY_TRENDS_URL: &str = "https://trends.google.com/trends/api/dailytrends";

#[derive(Debug, Deserialize)]
struct DailyTrendsResponse {
    default: DailyTrendsBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyTrendsBody {
    #[serde(default)]
    trending_searches_days: Vec<TrendingDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendingDay {
    #[serde(default)]
    trending_searches: Vec<TrendingSearch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendingSearch {
    title: QueryRef,
    #[serde(default)]
    related_queries: Vec<QueryRef>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct QueryRef {
    query: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    time_ago: String,
    url: String,
    #[serde(default)]
    snippet: String,
}

impl From<TrendingSearch> for Trend {
    fn from(search: TrendingSearch) -> Self {
        let articles = search
            .articles
            .into_iter()
            .map(|a| Article::new(a.title, a.url, a.time_ago, a.snippet))
            .collect();
        let mut trend = Trend::new(search.title.query).with_articles(articles);
        trend.related_terms = search.related_queries.into_iter().map(|q| q.query).collect();
        trend
    }
}

/// Decode one `dailytrends` response body into raw trends.
pub fn parse_daily_trends(body: &str) -> Result<Vec<Trend>, TrendSourceError> {
    let json = body.find('{').map(|i| &body[i..]).unwrap_or(body);
    let response: DailyTrendsResponse = serde_json::from_str(json)?;
    Ok(response
        .default
        .trending_searches_days
        .into_iter()
        .flat_map(|day| day.trending_searches)
        .map(Trend::from)
        .collect())
}

/// One request for one day, keyed by `YYYYMMDD`.
#[derive(Debug, Clone)]
pub struct DailyTrendsRequest {
    client: reqwest::Client,
    geo: String,
}

impl FetchAsync for DailyTrendsRequest {
    type Response = Vec<Trend>;
    type Error = TrendSourceError;

    async fn fetch(&self, day: &str) -> Result<Vec<Trend>, TrendSourceError> {
        let resp = self
            .client
            .get(DAILY_TRENDS_URL)
            .query(&[("hl", "en-US"), ("tz", "0"), ("geo", self.geo.as_str()), ("ed", day), ("ns", "15")])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TrendSourceError::Status(status.as_u16()));
        }
        parse_daily_trends(&resp.text().await?)
    }
}

/// [`TrendSource`] over the Google daily-trends endpoint.
#[derive(Debug)]
pub struct GoogleTrendsClient {
    request: RetryFetch<DailyTrendsRequest>,
    day_delay: Duration,
}

impl GoogleTrendsClient {
    /// Client for region `geo` (e.g. `"US"`), retrying each day `retries` times.
    pub fn new(geo: &str, retries: usize) -> Result<Self, TrendSourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let request = DailyTrendsRequest {
            client,
            geo: geo.to_string(),
        };
        Ok(Self {
            request: RetryFetch::new(request, retries, Duration::from_secs(1)),
            day_delay: Duration::from_millis(500),
        })
    }
}

impl TrendSource for GoogleTrendsClient {
    #[instrument(level = "info", skip_all, fields(%start, %end))]
    async fn fetch_raw_trends(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Trend>, TrendSourceError> {
        let mut all = Vec::new();
        let mut day = start;

        while day <= end {
            let key = day.format("%Y%m%d").to_string();
            match self.request.fetch(&key).await {
                Ok(trends) => {
                    info!(count = trends.len(), date = %day, "Fetched trends");
                    for (i, trend) in trends.iter().enumerate() {
                        debug!(index = i + 1, title = %trend.title, "Trend title");
                    }
                    all.extend(trends);
                }
                Err(e) => error!(date = %day, error = %e, "Failed to fetch trends"),
            }

            let Some(next) = day.checked_add_days(Days::new(1)) else {
                break;
            };
            day = next;
            if day <= end {
                sleep(self.day_delay).await;
            }
        }

        if all.is_empty() {
            return Err(TrendSourceError::Exhausted {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#")]}',
{"default":{"trendingSearchesDays":[{"date":"20250506","trendingSearches":[
  {"title":{"query":"Met Gala"},"formattedTraffic":"2M+",
   "relatedQueries":[{"query":"met gala 2025"},{"query":"met gala theme"}],
   "articles":[
     {"title":"Met Gala red carpet","timeAgo":"3h ago","source":"CNN","url":"https://cnn.com/met","snippet":"Stars arrive"},
     {"title":"Theme explained","timeAgo":"1h ago","url":"https://vogue.com/theme","snippet":"Tailored for you"}
   ]},
  {"title":{"query":"Eclipse"},"articles":[]}
]}]}}"#;

    #[test]
    fn test_parse_daily_trends() {
        let trends = parse_daily_trends(BODY).unwrap();
        assert_eq!(trends.len(), 2);

        let met = &trends[0];
        assert_eq!(met.title, "Met Gala");
        assert_eq!(met.related_terms, vec!["met gala 2025", "met gala theme"]);
        assert_eq!(met.articles.len(), 2);
        assert_eq!(met.articles[0].source_url, "https://cnn.com/met");
        assert_eq!(met.articles[0].relative_age, "3h ago");
        assert_eq!(met.articles[1].snippet, "Tailored for you");

        assert_eq!(trends[1].title, "Eclipse");
        assert!(trends[1].related_terms.is_empty());
    }

    #[test]
    fn test_parse_without_prefix() {
        let trends = parse_daily_trends(r#"{"default":{"trendingSearchesDays":[]}}"#).unwrap();
        assert!(trends.is_empty());
    }

    #[test]
    fn test_parse_garbage_is_decode_error() {
        let err = parse_daily_trends("<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, TrendSourceError::Decode(_)));
    }
}
