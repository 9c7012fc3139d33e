//! Error taxonomy for the ingestion and extraction pipeline.
//!
//! Only [`TrendSourceError::Exhausted`] is allowed to stop a run. Every other
//! error is recovered at the boundary of the component that produced it:
//!
//! | Error | Raised by | Recovery |
//! |-------|-----------|----------|
//! | [`ParseError`] | recency parsing, JSON-LD decoding | documented fallback value |
//! | [`RenderError`] | [`crate::render`] | article marked `ExtractionFailed` |
//! | [`EnrichmentError`] | [`crate::sources::wikipedia`] | trend keeps no reference content |
//! | [`TrendSourceError`] | [`crate::sources::google_trends`] | per-day skip, hard stop when nothing is left |
//! | [`ConfigError`] | [`crate::config`] | none, the run does not start |

use thiserror::Error;

/// Unparseable input that is replaced by a fallback value.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("relative age {0:?} has no numeric magnitude")]
    RelativeAge(String),

    #[error("malformed JSON-LD: {0}")]
    StructuredData(#[from] serde_json::Error),
}

/// Failure to render a single article URL.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not open render context: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("rendering {url} exceeded {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },
}

/// Failure of the best-effort secondary-source lookup.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("lookup request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected lookup response: {0}")]
    InvalidResponse(String),
}

/// Failure of the upstream trend source.
#[derive(Debug, Error)]
pub enum TrendSourceError {
    #[error("trend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("trend source answered with status {0}")]
    Status(u16),

    #[error("could not decode trend payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no trends returned for any day between {start} and {end}")]
    Exhausted { start: String, end: String },
}

/// Unreadable or malformed pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_messages_name_the_url() {
        let e = RenderError::Timeout {
            url: "https://example.com/a".to_string(),
            timeout_ms: 12_000,
        };
        assert_eq!(e.to_string(), "rendering https://example.com/a exceeded 12000ms");

        let e = RenderError::Status {
            url: "https://example.com/b".to_string(),
            status: 503,
        };
        assert!(e.to_string().contains("503"));
    }

    #[test]
    fn test_structured_data_error_from_serde() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let parse: ParseError = err.into();
        assert!(parse.to_string().starts_with("malformed JSON-LD"));
    }
}
