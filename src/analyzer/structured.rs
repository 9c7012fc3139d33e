//! JSON-LD extraction and sanitation.
//!
//! Publishers embed schema.org data with a lot of provenance boilerplate
//! (`@context`, publisher logos, canonical URLs). Those fields are removed from
//! every top-level object before the payload is kept for summarization.

use crate::error::ParseError;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::warn;

/// Fields removed from each top-level JSON-LD object.
pub const DENY_LIST: &[&str] = &[
    "@context",
    "@id",
    "url",
    "mainEntityOfPage",
    "publisher",
    "image",
    "thumbnailUrl",
    "logo",
    "isAccessibleForFree",
    "potentialAction",
    "sameAs",
    "copyrightHolder",
    "copyrightYear",
    "speakable",
];

static LD_JSON: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});

/// Parse raw JSON-LD text and strip it.
///
/// # Returns
///
/// The sanitized payload, or `None` when nothing is left after stripping.
///
/// # Errors
///
/// Returns [`ParseError::StructuredData`] when `raw` is not valid JSON.
pub fn parse_structured_data(raw: &str) -> Result<Option<Value>, ParseError> {
    let value: Value = serde_json::from_str(raw.trim())?;
    Ok(sanitize(value))
}

/// First JSON-LD block of the page, sanitized. `None` when absent, malformed
/// or empty after stripping.
pub fn extract_structured_data(document: &Html) -> Option<Value> {
    let raw: String = document.select(&LD_JSON).next()?.text().collect();
    match parse_structured_data(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Ignoring structured data");
            None
        }
    }
}

fn strip_object(mut object: Map<String, Value>) -> Option<Map<String, Value>> {
    for field in DENY_LIST {
        object.remove(*field);
    }
    (!object.is_empty()).then_some(object)
}

/// Remove deny-listed fields from a single object or an array of objects and
/// drop objects left empty.
pub fn sanitize(value: Value) -> Option<Value> {
    match value {
        Value::Object(object) => strip_object(object).map(Value::Object),
        Value::Array(items) => {
            let kept: Vec<Value> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(object) => strip_object(object).map(Value::Object),
                    other => Some(other),
                })
                .collect();
            (!kept.is_empty()).then_some(Value::Array(kept))
        }
        Value::Null => None,
        other => Some(other),
    }
}

/// Keywords declared by the structured data, as raw strings.
pub fn structured_keywords(value: &Value) -> Vec<String> {
    let objects: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    objects
        .into_iter()
        .filter_map(|o| o.get("keywords"))
        .flat_map(|k| match k {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(|i| i.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        })
        .collect()
}
