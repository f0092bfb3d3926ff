use anyhow::{Context, Result};
use common::FetchSettings;
use reqwest::Client;
use scraper::{Html, Selector};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Capability: turn an article URL into plain text.
#[async_trait::async_trait]
pub trait ArticleSource: Send + Sync {
    async fn extract_text(&self, url: &str) -> Result<String>;
}

/// Downloads a page and extracts its main text with readability,
/// falling back to CSS selector heuristics.
pub struct ReadabilityExtractor {
    client: Client,
}

impl ReadabilityExtractor {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(settings.user_agent.clone())
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl ArticleSource for ReadabilityExtractor {
    async fn extract_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.context("failed to fetch article page")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("article fetch failed with status: {}", status));
        }

        let html = response.text().await.context("failed to read response body")?;
        let url_obj = url::Url::parse(url).context("failed to parse article URL")?;

        Ok(html_to_text(&html, &url_obj))
    }
}

/// Wide enough that html2text never hard-wraps a paragraph.
const RENDER_WIDTH: usize = 10_000;

/// Main-content text of an HTML page, empty if nothing usable is found.
pub fn html_to_text(html: &str, url: &url::Url) -> String {
    let mut reader = Cursor::new(html.as_bytes());
    match readability::extractor::extract(&mut reader, url) {
        Ok(product) => {
            let text = match html2text::from_read(product.content.as_bytes(), RENDER_WIDTH) {
                Ok(text) => text,
                Err(e) => {
                    warn!("scraping: failed to render extracted HTML as text: {}", e);
                    product.text
                }
            };
            if !text.trim().is_empty() {
                debug!("scraping: readability extracted {} chars from {}", text.len(), url);
                return text;
            }
        }
        Err(e) => warn!("scraping: readability failed for {}: {}", url, e),
    }

    selector_fallback(html)
}

fn selector_fallback(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector_str in ["article", "main", ".post-content", ".entry-content", "#content"] {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            if let Ok(text) = html2text::from_read(element.html().as_bytes(), RENDER_WIDTH) {
                if !text.trim().is_empty() {
                    debug!("scraping: found content using selector '{}'", selector_str);
                    return text;
                }
            }
        }
    }

    // Last resort: every paragraph on the page
    let Ok(p_selector) = Selector::parse("p") else {
        return String::new();
    };
    document
        .select(&p_selector)
        .map(|p| p.text().collect::<String>())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wraps an [`ArticleSource`] with the digest's extraction contract:
/// never fails, blank becomes empty, output is capped at `max_len` chars.
pub struct ArticleExtractor {
    source: Arc<dyn ArticleSource>,
    max_len: usize,
}

impl ArticleExtractor {
    pub fn new(source: Arc<dyn ArticleSource>, max_len: usize) -> Self {
        Self { source, max_len }
    }

    pub async fn extract(&self, url: &str) -> String {
        info!("Scraping article body: {}", url);
        match self.source.extract_text(url).await {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    warn!("Article body is empty: {}", url);
                    return String::new();
                }
                truncate_chars(text, self.max_len)
            }
            Err(e) => {
                warn!("Article scraping failed: {}: {:#}", url, e);
                String::new()
            }
        }
    }
}

/// First `max_chars` characters of `s` (not bytes, no word boundary).
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
