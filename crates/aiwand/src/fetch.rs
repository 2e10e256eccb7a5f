//! Content fetching for `extract`: remote pages and local files.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use aiwand_core::utils::truncate_string;
use aiwand_core::{AiError, Result};

/// Maximum characters of fetched content handed to the model.
pub const DEFAULT_MAX_CHARS: usize = 50_000;

const USER_AGENT: &str = concat!("aiwand/", env!("CARGO_PKG_VERSION"));

/// Where a link points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkKind {
    Url(String),
    File(PathBuf),
}

impl LinkKind {
    /// `http(s)://` and `www.` links are remote; `file://` and bare paths are local.
    pub fn classify(link: &str) -> Self {
        let link = link.trim();
        if link.starts_with("http://") || link.starts_with("https://") {
            LinkKind::Url(link.to_string())
        } else if link.starts_with("www.") {
            LinkKind::Url(format!("https://{link}"))
        } else if let Some(path) = link.strip_prefix("file://") {
            LinkKind::File(PathBuf::from(path))
        } else {
            LinkKind::File(PathBuf::from(link))
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, LinkKind::File(_))
    }
}

/// Turns a link into text.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, link: &str) -> Result<String>;
}

/// Fetches URLs over HTTP and reads local files from disk.
pub struct DefaultFetcher {
    client: reqwest::Client,
    max_chars: usize,
}

impl DefaultFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build fetch client, using reqwest defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    async fn fetch_url(&self, link: &str, url: &str) -> Result<String> {
        debug!(url, "Fetching URL");
        let fetch_err = |reason: String| AiError::Fetch {
            link: link.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        let body = response.text().await.map_err(|e| fetch_err(e.to_string()))?;
        Ok(truncate_string(&page_to_text(&content_type, &body), self.max_chars))
    }

    async fn read_file(&self, link: &str, path: &Path) -> Result<String> {
        debug!(path = %path.display(), "Reading file");
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AiError::Fetch {
                link: link.to_string(),
                reason: e.to_string(),
            })
    }
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentFetcher for DefaultFetcher {
    async fn fetch(&self, link: &str) -> Result<String> {
        match LinkKind::classify(link) {
            LinkKind::Url(url) => self.fetch_url(link, &url).await,
            LinkKind::File(path) => self.read_file(link, &path).await,
        }
    }
}

/// Pick a text rendition for a response body based on its content type.
fn page_to_text(content_type: &str, body: &str) -> String {
    if content_type.contains("application/json") {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| serde_json::to_string_pretty(&v).ok())
            .unwrap_or_else(|| body.to_string())
    } else if content_type.contains("text/html") || body.trim_start().starts_with('<') {
        html_to_text(body)
    } else {
        body.to_string()
    }
}

// ─────────────────────────────────────────────
// HTML → text
// ─────────────────────────────────────────────

struct HtmlPatterns {
    hidden: Regex,
    breaks: Regex,
    tags: Regex,
    spaces: Regex,
    blank_lines: Regex,
}

fn html_patterns() -> &'static HtmlPatterns {
    static PATTERNS: OnceLock<HtmlPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| HtmlPatterns {
        hidden: Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)\s*>")
            .unwrap(),
        breaks: Regex::new(r"(?i)<(br|/p|/div|/li|/h[1-6]|/tr)\b[^>]*>").unwrap(),
        tags: Regex::new(r"(?s)<[^>]*>").unwrap(),
        spaces: Regex::new(r"[ \t\r\f]+").unwrap(),
        blank_lines: Regex::new(r"\n\s*\n+").unwrap(),
    })
}

/// Strip markup from an HTML page, keeping rough line structure.
pub fn html_to_text(html: &str) -> String {
    let p = html_patterns();
    let text = p.hidden.replace_all(html, "");
    let text = p.breaks.replace_all(&text, "\n");
    let text = p.tags.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = p.spaces.replace_all(&text, " ");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    p.blank_lines.replace_all(&joined, "\n\n").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
