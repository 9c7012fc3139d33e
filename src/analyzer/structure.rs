//! Outline, link, question and media census of the article body.

use crate::models::{ContentStructure, ImageRef, LinkCensus, MediaCensus, VideoRef};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| selector("p"));
static LISTS: Lazy<Selector> = Lazy::new(|| selector("ul, ol"));
static TABLES: Lazy<Selector> = Lazy::new(|| selector("table"));
static ANCHORS: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static IMAGES: Lazy<Selector> = Lazy::new(|| selector("img"));
static VIDEOS: Lazy<Selector> = Lazy::new(|| selector("video"));
static HEADINGS: Lazy<Vec<Selector>> =
    Lazy::new(|| (1..=6).map(|level| selector(&format!("h{level}"))).collect());

static QUESTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?]*\?").expect("valid regex"));

/// Outline of the article body.
///
/// # Arguments
///
/// * `document` - The readable content, parsed as a fragment
///
/// # Returns
///
/// Heading texts keyed `"H1"` through `"H6"` (every level present, possibly
/// empty), plus paragraph, list and table counts.
pub fn content_structure(document: &Html) -> ContentStructure {
    let headings = HEADINGS
        .iter()
        .enumerate()
        .map(|(i, sel)| {
            let texts = document
                .select(sel)
                .map(|h| h.text().collect::<String>().trim().to_string())
                .collect();
            (format!("H{}", i + 1), texts)
        })
        .collect::<BTreeMap<_, _>>();

    ContentStructure {
        headings,
        paragraph_count: document.select(&PARAGRAPHS).count(),
        list_count: document.select(&LISTS).count(),
        table_count: document.select(&TABLES).count(),
    }
}

/// Split body links by whether they resolve to `article_url`'s host.
///
/// Relative links resolve against the article URL. Non-HTTP links and
/// unparseable hrefs are skipped.
pub fn link_census(document: &Html, article_url: &str) -> LinkCensus {
    let base = Url::parse(article_url).ok();
    let host = base.as_ref().and_then(|b| b.host_str().map(str::to_string));
    let mut census = LinkCensus::default();

    for anchor in document.select(&ANCHORS) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim().trim_end_matches('#');
        let resolved = match &base {
            Some(base) => base.join(href),
            None => Url::parse(href),
        };
        let Ok(resolved) = resolved else {
            debug!(%href, "Skipping unparseable link");
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }

        if resolved.host_str().is_some() && resolved.host_str() == host.as_deref() {
            census.internal.push(href.to_string());
        } else {
            census.external.push(href.to_string());
        }
    }
    census
}

/// Sentences of `text` that end in a question mark.
pub fn questions(text: &str) -> Vec<String> {
    QUESTION
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|q| q.len() > 1)
        .collect()
}

/// Images and videos of the article body.
///
/// Missing `src`, `alt` or `poster` attributes are recorded as empty strings
/// so every element is counted.
pub fn media_census(document: &Html) -> MediaCensus {
    let attr = |e: &scraper::ElementRef, name: &str| e.value().attr(name).unwrap_or_default().to_string();

    MediaCensus {
        images: document
            .select(&IMAGES)
            .map(|img| ImageRef {
                src: attr(&img, "src"),
                alt: attr(&img, "alt"),
            })
            .collect(),
        videos: document
            .select(&VIDEOS)
            .map(|video| VideoRef {
                src: attr(&video, "src"),
                poster: attr(&video, "poster"),
            })
            .collect(),
    }
}
