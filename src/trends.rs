//! Deduplication and recency ordering of raw trends.
//!
//! Normalization runs in three passes:
//!
//! 1. Drop trends whose title was already seen (first occurrence wins, no merge)
//! 2. Sort each trend's articles newest first (stable)
//! 3. Sort trends by the recency of their newest article (stable)
//!
//! Trends without articles have no recency. They hold their input slot while
//! the dated trends are reordered around them, which keeps the output
//! deterministic for snapshots and makes the whole pass idempotent.

use crate::models::{Article, Trend};
use crate::recency;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::cmp::Reverse;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Normalize a raw trend sequence against `now`.
#[instrument(level = "info", skip_all, fields(raw = raw_trends.len()))]
pub fn normalize(raw_trends: Vec<Trend>, now: DateTime<Utc>) -> Vec<Trend> {
    let mut trends = dedupe_by_title(raw_trends);

    for trend in &mut trends {
        tidy_trend(trend);
        sort_articles(&mut trend.articles, now);
    }
    sort_by_newest_article(&mut trends, now);

    info!(count = trends.len(), "Normalized trends");
    trends
}

fn dedupe_by_title(raw_trends: Vec<Trend>) -> Vec<Trend> {
    let mut seen = HashSet::new();
    raw_trends
        .into_iter()
        .filter(|trend| {
            let first = seen.insert(trend.title.clone());
            if !first {
                debug!(title = %trend.title, "Dropping duplicate trend");
            }
            first
        })
        .collect()
}

/// Enforce per-trend uniqueness of article URLs and related terms.
fn tidy_trend(trend: &mut Trend) {
    let articles = std::mem::take(&mut trend.articles);
    trend.articles = articles
        .into_iter()
        .unique_by(|a| a.source_url.clone())
        .collect();

    let terms = std::mem::take(&mut trend.related_terms);
    trend.related_terms = terms.into_iter().unique().collect();
}

fn sort_articles(articles: &mut [Article], now: DateTime<Utc>) {
    // `sort_by_cached_key` is stable; equal instants keep input order.
    articles.sort_by_cached_key(|a| Reverse(recency::resolve(&a.relative_age, now)));
}

fn newest_article_instant(trend: &Trend, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    trend
        .articles
        .first()
        .map(|a| recency::resolve(&a.relative_age, now))
}

fn sort_by_newest_article(trends: &mut Vec<Trend>, now: DateTime<Utc>) {
    let slots: Vec<usize> = trends
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.articles.is_empty())
        .map(|(i, _)| i)
        .collect();

    let mut dated: Vec<(DateTime<Utc>, Trend)> = Vec::with_capacity(slots.len());
    let mut cells: Vec<Option<Trend>> = std::mem::take(trends).into_iter().map(Some).collect();
    for &slot in &slots {
        if let Some(trend) = cells[slot].take() {
            if let Some(instant) = newest_article_instant(&trend, now) {
                dated.push((instant, trend));
            }
        }
    }
    dated.sort_by_key(|(instant, _)| Reverse(*instant));

    for (&slot, (_, trend)) in slots.iter().zip(dated) {
        cells[slot] = Some(trend);
    }
    *trends = cells.into_iter().flatten().collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap()
    }

    fn article(url: &str, age: &str) -> Article {
        Article::new(format!("title {url}"), url, age, "")
    }

    fn trend(title: &str, ages: &[&str]) -> Trend {
        let articles = ages
            .iter()
            .enumerate()
            .map(|(i, age)| article(&format!("https://example.com/{title}/{i}"), age))
            .collect();
        Trend::new(title).with_articles(articles)
    }

    fn titles(trends: &[Trend]) -> Vec<&str> {
        trends.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_articles_sorted_newest_first() {
        let out = normalize(vec![trend("X", &["1d ago", "2h ago"])], now());
        let ages: Vec<_> = out[0].articles.iter().map(|a| a.relative_age.as_str()).collect();
        assert_eq!(ages, vec!["2h ago", "1d ago"]);
    }

    #[test]
    fn test_duplicate_titles_keep_first_without_merge() {
        let first = trend("X", &["2h ago"]);
        let second = trend("X", &["1h ago", "3h ago"]);
        let out = normalize(vec![first, trend("Y", &["5h ago"]), second], now());

        assert_eq!(titles(&out), vec!["X", "Y"]);
        assert_eq!(out[0].articles.len(), 1);
    }

    #[test]
    fn test_equal_recency_articles_keep_input_order() {
        let mut t = Trend::new("X");
        t.articles = vec![
            article("https://a.com/1", "3h ago"),
            article("https://a.com/2", "1h ago"),
            article("https://a.com/3", "3h ago"),
            article("https://a.com/4", "1h ago"),
        ];
        let out = normalize(vec![t], now());
        let urls: Vec<_> = out[0].articles.iter().map(|a| a.source_url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.com/2", "https://a.com/4", "https://a.com/1", "https://a.com/3"]
        );
    }

    #[test]
    fn test_trends_sorted_by_newest_article() {
        let out = normalize(
            vec![
                trend("old", &["3d ago"]),
                trend("fresh", &["10m ago", "5d ago"]),
                trend("mid", &["6h ago"]),
            ],
            now(),
        );
        assert_eq!(titles(&out), vec!["fresh", "mid", "old"]);
    }

    #[test]
    fn test_trends_without_articles_hold_their_slot() {
        let out = normalize(
            vec![
                trend("old", &["3d ago"]),
                Trend::new("empty"),
                trend("fresh", &["1h ago"]),
            ],
            now(),
        );
        assert_eq!(titles(&out), vec!["fresh", "empty", "old"]);
    }

    #[test]
    fn test_duplicate_urls_within_trend_are_dropped() {
        let mut t = Trend::new("X");
        t.articles = vec![
            article("https://a.com/1", "3h ago"),
            article("https://a.com/1", "1h ago"),
        ];
        t.related_terms = vec!["a".into(), "b".into(), "a".into()];
        let out = normalize(vec![t], now());
        assert_eq!(out[0].articles.len(), 1);
        assert_eq!(out[0].articles[0].relative_age, "3h ago");
        assert_eq!(out[0].related_terms, vec!["a", "b"]);
    }

    #[test]
    fn test_same_url_allowed_across_trends() {
        let mut a = Trend::new("A");
        a.articles = vec![article("https://shared.com/x", "1h ago")];
        let mut b = Trend::new("B");
        b.articles = vec![article("https://shared.com/x", "2h ago")];
        let out = normalize(vec![a, b], now());
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|t| t.articles.len() == 1));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = vec![
            trend("b", &["1d ago", "2h ago", "whenever"]),
            Trend::new("none"),
            trend("a", &["5m ago"]),
            trend("b", &["1m ago"]),
            trend("c", &["2w ago", "1mo ago"]),
        ];
        let once = normalize(raw, now());
        let twice = normalize(once.clone(), now());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_output_titles_unique() {
        let raw = vec![
            trend("a", &["1h ago"]),
            trend("a", &["2h ago"]),
            Trend::new("b"),
            Trend::new("b"),
            trend("c", &["1d ago"]),
        ];
        let out = normalize(raw, now());
        let unique: HashSet<_> = out.iter().map(|t| t.title.clone()).collect();
        assert_eq!(unique.len(), out.len());
    }
}
