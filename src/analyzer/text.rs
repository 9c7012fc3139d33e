//! Markup cleanup and canonical plain-text conversion.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex"));
static STYLESHEET_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<link\b[^>]*rel\s*=\s*["']?stylesheet["']?[^>]*>"#).expect("valid regex")
});
static STYLE_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\s+style\s*=\s*("[^"]*"|'[^']*')"#).expect("valid regex"));
static CLASS_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\s+class\s*=\s*("[^"]*"|'[^']*')"#).expect("valid regex"));

static ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<a\b[^>]*>(.*?)</a\s*>").expect("valid regex"));
static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("valid regex"));
static BLOCK_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|tr|td|th|dt|dd|caption|figcaption|blockquote|section|article|header|footer|aside|main|nav|pre|ul|ol|table)\s*>",
    )
    .expect("valid regex")
});
static NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]*[\r\n]+[ \t]*").expect("valid regex"));

/// Remove `<style>` blocks, linked stylesheets and inline `style` attributes.
pub fn strip_presentation(markup: &str) -> String {
    let without_blocks = STYLE_BLOCK.replace_all(markup, "");
    let without_links = STYLESHEET_LINK.replace_all(&without_blocks, "");
    STYLE_ATTR.replace_all(&without_links, "").into_owned()
}

/// [`strip_presentation`] plus `class` attributes.
pub fn strip_css(markup: &str) -> String {
    CLASS_ATTR
        .replace_all(&strip_presentation(markup), "")
        .into_owned()
}

/// Reduce `[text](url)` and `<a ...>text</a>` to their visible text.
pub fn strip_links(text: &str) -> String {
    let without_anchors = ANCHOR.replace_all(text, "$1");
    MARKDOWN_LINK.replace_all(&without_anchors, "$1").into_owned()
}

/// Canonical plain text of rich content, on a single line.
///
/// Links are reduced to their text, tags dropped, entities decoded, and
/// newlines collapsed to single spaces.
pub fn to_plain_text(content: &str) -> String {
    let delinked = strip_links(content);
    let broken = BLOCK_BREAK.replace_all(&delinked, "$0\n");
    let fragment = Html::parse_fragment(&broken);
    let text: String = fragment.root_element().text().collect();
    NEWLINES.replace_all(&text, " ").trim().to_string()
}

/// Number of whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
