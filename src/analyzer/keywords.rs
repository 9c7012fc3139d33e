//! Keyword set normalization.
//!
//! Order matters here. Case is folded before deduplication so that `"AI"` and
//! `"ai"` collapse into one entry, and title casing is applied only to the
//! survivors. Commas are allowed through the punctuation filter so that
//! compound entries can be split afterwards.

use crate::utils::upcase;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

static SPECIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s,]").expect("valid regex"));

/// Normalize raw keywords into a deduplicated, title-cased list.
///
/// Steps: trim and drop empties, lowercase, drop entries with punctuation,
/// split on commas, deduplicate (first occurrence wins), title-case.
pub fn normalize_keywords<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|k| k.as_ref().trim().to_string())
        .filter(|k| !k.is_empty())
        .map(|k| k.to_lowercase())
        .filter(|k| !SPECIAL.is_match(k))
        .flat_map(|k| {
            k.split(',')
                .map(|part| part.split_whitespace().join(" "))
                .collect::<Vec<_>>()
        })
        .filter(|k| !k.is_empty())
        .unique()
        .map(|k| title_case(&k))
        .collect()
}

/// Uppercase the first letter of every word.
pub fn title_case(text: &str) -> String {
    text.split_whitespace().map(upcase).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_keyword_normalization() {
        let out = normalize_keywords(["AI", "ai", "A.I.!", "machine learning, tech"]);
        assert_eq!(out, vec!["Ai", "Machine Learning", "Tech"]);
    }

    #[test]
    fn test_empty_and_whitespace_entries_dropped() {
        let out = normalize_keywords(["", "   ", "space , , race"]);
        assert_eq!(out, vec!["Space", "Race"]);
    }

    #[test]
    fn test_dedup_after_split_and_space_collapse() {
        let out = normalize_keywords(["solar  eclipse", "Solar Eclipse, sun", "SUN"]);
        assert_eq!(out, vec!["Solar Eclipse", "Sun"]);
    }

    #[test]
    fn test_normalization_is_stable_on_its_output() {
        let once = normalize_keywords(["covid 19", "Open AI", "world cup 2026"]);
        assert_eq!(once, vec!["Covid 19", "Open Ai", "World Cup 2026"]);
        assert_eq!(normalize_keywords(&once), once);
    }

    #[test]
    fn test_hyphenated_entries_dropped() {
        let out = normalize_keywords(["covid-19", "e-mail", "ok"]);
        assert_eq!(out, vec!["Ok"]);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("new york  city"), "New York City");
        assert_eq!(title_case(""), "");
    }
}
