//! Page rendering capability used by the extraction scheduler.
//!
//! A [`Renderer`] opens one [`RenderContext`] per extraction task. The context
//! is owned by that task alone and must be closed on every exit path, which
//! the scheduler guarantees. This module also provides [`HttpRenderer`], which
//! fetches either through a Browserless-style `/content` endpoint (headless
//! Chrome) or directly over HTTP, and then pulls the readable article out of
//! the page.

use crate::error::RenderError;
use crate::models::RenderedPage;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Factory for per-task rendering sessions.
pub trait Renderer {
    type Context: RenderContext;

    /// Acquire a fresh rendering context.
    async fn open(&self) -> Result<Self::Context, RenderError>;
}

/// One exclusive rendering session.
pub trait RenderContext {
    /// Render `url` and return its title, description, readable content and markup.
    async fn render(&mut self, url: &str) -> Result<RenderedPage, RenderError>;

    /// Release the session. Called exactly once per opened context.
    async fn close(self);
}

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/113.0.0.0 Safari/537.36";

/// Where page markup comes from.
#[derive(Debug, Clone)]
pub enum Backend {
    /// Plain GET of the article URL.
    Direct,
    /// POST to `{base_url}/content`, which returns the markup after JavaScript ran.
    Browserless { base_url: String, token: Option<String> },
}

/// [`Renderer`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    backend: Backend,
    request_timeout: Duration,
}

impl HttpRenderer {
    /// Build a renderer. A `browserless_url` switches to headless rendering.
    ///
    /// # Arguments
    ///
    /// * `browserless_url` - Base URL of a Browserless-compatible service, or
    ///   `None` to fetch pages directly
    /// * `token` - Token appended to the `/content` request, if the service needs one
    /// * `request_timeout` - Per-request HTTP timeout of each context's client
    pub fn new(
        browserless_url: Option<&str>,
        token: Option<&str>,
        request_timeout: Duration,
    ) -> Self {
        let backend = match browserless_url {
            Some(base) => Backend::Browserless {
                base_url: base.trim_end_matches('/').to_string(),
                token: token.map(String::from),
            },
            None => Backend::Direct,
        };
        info!(
            headless = matches!(backend, Backend::Browserless { .. }),
            "Renderer configured"
        );
        Self {
            backend,
            request_timeout,
        }
    }
}

impl Renderer for HttpRenderer {
    type Context = HttpContext;

    async fn open(&self) -> Result<HttpContext, RenderError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        Ok(HttpContext {
            client,
            backend: self.backend.clone(),
        })
    }
}

/// Session holding its own HTTP client and connection pool.
#[derive(Debug)]
pub struct HttpContext {
    client: reqwest::Client,
    backend: Backend,
}

impl HttpContext {
    async fn fetch_markup(&self, url: &str) -> Result<String, RenderError> {
        let navigation = |e: reqwest::Error| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        };

        let request = match &self.backend {
            Backend::Direct => self.client.get(url),
            Backend::Browserless { base_url, token } => {
                let mut endpoint = format!("{base_url}/content");
                if let Some(token) = token {
                    endpoint.push_str(&format!("?token={}", urlencoding::encode(token)));
                }
                self.client
                    .post(endpoint)
                    .json(&serde_json::json!({ "url": url }))
            }
        };

        let resp = request.send().await.map_err(navigation)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RenderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(navigation)
    }
}

impl RenderContext for HttpContext {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn render(&mut self, url: &str) -> Result<RenderedPage, RenderError> {
        let markup = self.fetch_markup(url).await?;
        let page = extract_readable(&markup);
        if page.content.trim().is_empty() {
            warn!(%url, "Rendered page has no readable content");
        }
        info!(bytes = page.markup.len(), "Rendered page");
        Ok(page)
    }

    async fn close(self) {
        debug!("Closing render context");
        drop(self.client);
    }
}

static CHROME_BLOCKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["script", "style", "noscript", "nav", "header", "footer", "aside", "form"]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("valid regex"))
        .collect()
});

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|m| m.value().attr("content"))
        .map(|c| c.trim().to_string())
        .find(|c| !c.is_empty())
}

/// Pull title, description and the readable body out of a full page.
///
/// The body is the first of `<article>`, `<main>` or `<body>`, with scripts,
/// styles and navigation chrome removed.
///
/// # Arguments
///
/// * `markup` - The complete page HTML as returned by the backend
///
/// # Returns
///
/// A [`RenderedPage`] with the title from `og:title` or `<title>`, the
/// description from `og:description` or `meta[name="description"]`, the
/// cleaned body as `content` and the untouched input as `markup`.
pub fn extract_readable(markup: &str) -> RenderedPage {
    let document = Html::parse_document(markup);

    let title = meta_content(&document, r#"meta[property="og:title"]"#).or_else(|| {
        let selector = Selector::parse("title").ok()?;
        document
            .select(&selector)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    });
    let description = meta_content(&document, r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="description"]"#));

    let body = ["article", "main", "body"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|s| document.select(&s).next().map(|e| e.inner_html()))
        .unwrap_or_default();
    let content = CHROME_BLOCKS
        .iter()
        .fold(body, |acc, re| re.replace_all(&acc, "").into_owned());

    RenderedPage {
        title,
        description,
        content: content.trim().to_string(),
        markup: markup.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <title>Fallback Title</title>
        <meta property="og:title" content="Eclipse Draws Crowds">
        <meta name="description" content="Millions watched.">
        <script>var tracking = 1;</script>
        </head><body>
        <nav><a href="/">Home</a></nav>
        <article><h1>Eclipse Draws Crowds</h1><script>ads()</script><p>Millions watched the sky.</p></article>
        <footer>Copyright</footer>
        </body></html>"#;

    #[test]
    fn test_extract_readable_prefers_article_and_og_title() {
        let page = extract_readable(PAGE);
        assert_eq!(page.title.as_deref(), Some("Eclipse Draws Crowds"));
        assert_eq!(page.description.as_deref(), Some("Millions watched."));
        assert!(page.content.contains("<p>Millions watched the sky.</p>"));
        assert!(!page.content.contains("ads()"));
        assert!(!page.content.contains("Home"));
        assert_eq!(page.markup, PAGE);
    }

    #[test]
    fn test_extract_readable_falls_back_to_body_and_title_tag() {
        let page = extract_readable(
            "<html><head><title> Plain </title></head><body><nav>x</nav><p>Text</p></body></html>",
        );
        assert_eq!(page.title.as_deref(), Some("Plain"));
        assert_eq!(page.description, None);
        assert_eq!(page.content, "<p>Text</p>");
    }

    #[test]
    fn test_browserless_backend_trims_trailing_slash() {
        let renderer = HttpRenderer::new(Some("http://chrome:3000/"), None, Duration::from_secs(5));
        match renderer.backend {
            Backend::Browserless { ref base_url, .. } => assert_eq!(base_url, "http://chrome:3000"),
            Backend::Direct => panic!("expected browserless backend"),
        }
    }
}
