//! Page metadata from `<title>` and `<meta>` tags.

use crate::models::PageMetadata;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

/// Description used when the page has no `meta[name="description"]`.
pub const MISSING_DESCRIPTION: &str = "No description provided";

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).expect("valid selector"));
static KEYWORDS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="keywords"]"#).expect("valid selector"));

fn first_meta(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(|c| c.trim().to_string())
}

/// Read the page title, description and declared keywords.
///
/// # Arguments
///
/// * `document` - The full page, already stripped of presentation markup
///
/// # Returns
///
/// A [`PageMetadata`] whose `title` is empty when there is no `<title>`,
/// whose `description` falls back to [`MISSING_DESCRIPTION`], and whose
/// `keywords` are the trimmed, non-empty comma-separated entries of
/// `meta[name="keywords"]`.
pub fn extract_metadata(document: &Html) -> PageMetadata {
    let title = document
        .select(&TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let description = first_meta(document, &DESCRIPTION)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| MISSING_DESCRIPTION.to_string());

    let keywords = first_meta(document, &KEYWORDS)
        .map(|k| {
            k.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    PageMetadata {
        title,
        description,
        keywords,
    }
}
