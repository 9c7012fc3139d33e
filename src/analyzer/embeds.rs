//! Social-media embed detection.
//!
//! Embeds are matched by the class the platform's embed script expects, or by
//! a substring of an iframe `src`. Every platform key is present in the output,
//! with an empty list when nothing matched.

use crate::models::EmbedDescriptor;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::BTreeMap;

static PLATFORMS: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    [
        (
            "twitter",
            r#"blockquote.twitter-tweet, iframe[src*="twitter.com"]"#,
        ),
        (
            "youtube",
            r#"iframe[src*="youtube.com"], iframe[src*="youtu.be"], iframe[src*="youtube-nocookie.com"]"#,
        ),
        ("tiktok", r#"blockquote.tiktok-embed, iframe[src*="tiktok.com"]"#),
        (
            "instagram",
            r#"blockquote.instagram-media, iframe[src*="instagram.com"]"#,
        ),
        (
            "facebook",
            r#"div.fb-post, div.fb-video, iframe[src*="facebook.com/plugins"]"#,
        ),
    ]
    .into_iter()
    .map(|(name, css)| (name, Selector::parse(css).expect("valid selector")))
    .collect()
});

/// Collect social-media embeds per platform.
///
/// # Arguments
///
/// * `document` - The full page markup, with class attributes intact
///
/// # Returns
///
/// A map from platform name to its embeds in document order. Each descriptor
/// carries the embed's `src` (or `cite` / `data-href`) and its outer HTML.
/// Every platform key is present, with an empty list when nothing matched.
pub fn extract_embeds(document: &Html) -> BTreeMap<String, Vec<EmbedDescriptor>> {
    PLATFORMS
        .iter()
        .map(|(name, selector)| {
            let found = document
                .select(selector)
                .map(|element| {
                    let attrs = element.value();
                    EmbedDescriptor {
                        src: attrs
                            .attr("src")
                            .or_else(|| attrs.attr("cite"))
                            .or_else(|| attrs.attr("data-href"))
                            .map(str::to_string),
                        html: element.html(),
                    }
                })
                .collect();
            (name.to_string(), found)
        })
        .collect()
}
