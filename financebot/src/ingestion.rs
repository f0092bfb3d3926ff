use anyhow::{Context, Result};
use common::FetchSettings;
use feed_rs::model::Link;
use feed_rs::parser;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Title used when a feed entry carries none.
pub const UNTITLED: &str = "无标题";

/// Capability: download the raw bytes of a feed document.
#[async_trait::async_trait]
pub trait FeedTransport: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// reqwest-backed feed transport with a browser-like User-Agent.
pub struct HttpFeedTransport {
    client: Client,
}

impl HttpFeedTransport {
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
impl FeedTransport for HttpFeedTransport {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("network error during fetch")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("feed fetch failed with status: {}", status));
        }

        let bytes = response.bytes().await.context("failed to read response body")?;
        Ok(bytes.to_vec())
    }
}

/// One decoded feed item, reduced to what the digest needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    /// Primary `<link>` of the entry
    pub link: Option<String>,
    /// Entry identifier (RSS `<guid>`, Atom `<id>`)
    pub guid: Option<String>,
}

impl FeedEntry {
    /// The URL this entry should point at: the primary link, or the
    /// identifier when that identifier is itself an http(s) URL.
    pub fn resolve_link(&self) -> Option<&str> {
        let link = self.link.as_deref().map(str::trim).filter(|l| !l.is_empty());
        link.or_else(|| {
            self.guid
                .as_deref()
                .map(str::trim)
                .filter(|g| g.starts_with("http://") || g.starts_with("https://"))
        })
    }
}

/// Decode an RSS/Atom document into entries, in document order.
pub fn decode_entries(bytes: &[u8]) -> Result<Vec<FeedEntry>> {
    let feed = parser::parse(bytes).context("failed to parse feed")?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let title = entry
                .title
                .map(|t| t.content.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNTITLED.to_string());
            let link = primary_link(&entry.links);
            let guid = Some(entry.id).filter(|id| !id.trim().is_empty());

            FeedEntry { title, link, guid }
        })
        .collect();

    Ok(entries)
}

/// The entry's page: the `alternate` link (or one without `rel`), else the
/// first link. Atom entries often list `replies`/`edit`/`self` links first.
fn primary_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
}

/// Fixed-delay retry policy for feed fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least one is always made
    pub max_attempts: u32,
    /// Constant pause between two attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// No pause between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    pub fn from_settings(settings: &FetchSettings) -> Self {
        Self::new(settings.retries, Duration::from_secs(settings.retry_delay_seconds))
    }
}

/// Fetches and decodes a feed, retrying on any failure or an empty feed.
pub struct RetryingFetcher {
    transport: Arc<dyn FeedTransport>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(transport: Arc<dyn FeedTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Returns the decoded entries of the first attempt that yields at
    /// least one entry. Every other outcome counts as a failed attempt.
    pub async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 && !self.policy.delay.is_zero() {
                info!("Retrying feed fetch for {} (attempt {}/{}) after {:?}...", url, attempt, max_attempts, self.policy.delay);
                tokio::time::sleep(self.policy.delay).await;
            }

            let outcome = match self.transport.fetch_bytes(url).await {
                Ok(bytes) => decode_entries(&bytes),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(entries) if !entries.is_empty() => return Ok(entries),
                Ok(_) => {
                    warn!(attempt, url, "feed decoded but contains no entries");
                    last_error = Some(anyhow::anyhow!("feed contains no entries"));
                }
                Err(e) => {
                    warn!(attempt, url, error = %e, "feed fetch attempt failed");
                    last_error = Some(e);
                }
            }
        }

        error!("Skipping {} after {} failed attempts", url, max_attempts);
        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("unknown error after retries"))
            .context(format!("feed unavailable after {} attempts", max_attempts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Markets</title>
    <link>https://example.com</link>
    <description>test</description>
    <item>
      <title>Stocks rally</title>
      <link>https://example.com/a</link>
      <description>Short summary</description>
    </item>
    <item>
      <title>Guid only</title>
      <guid>https://example.com/b</guid>
    </item>
    <item>
      <link>https://example.com/c</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn decodes_rss_items_in_order() {
        let entries = decode_entries(RSS.as_bytes()).expect("decode");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title, "Stocks rally");
        assert_eq!(entries[0].resolve_link(), Some("https://example.com/a"));
        assert_eq!(entries[1].resolve_link(), Some("https://example.com/b"));
        assert_eq!(entries[2].title, UNTITLED);
    }

    #[test]
    fn atom_entries_link_to_the_alternate_page() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Rates blog</title>
  <id>urn:uuid:feed</id>
  <updated>2024-03-01T08:00:00Z</updated>
  <entry>
    <title>Rate decision</title>
    <id>urn:uuid:entry-1</id>
    <updated>2024-03-01T08:00:00Z</updated>
    <link rel="replies" type="application/atom+xml" href="https://blog.example/feeds/1/comments"/>
    <link rel="edit" href="https://blog.example/api/posts/1"/>
    <link rel="alternate" type="text/html" href="https://blog.example/2024/rates.html"/>
  </entry>
  <entry>
    <title>Only a self link</title>
    <id>urn:uuid:entry-2</id>
    <updated>2024-03-01T09:00:00Z</updated>
    <link rel="self" href="https://blog.example/2024/self.html"/>
  </entry>
</feed>"#;
        let entries = decode_entries(atom.as_bytes()).expect("decode");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].resolve_link(), Some("https://blog.example/2024/rates.html"));
        assert_eq!(entries[1].resolve_link(), Some("https://blog.example/2024/self.html"));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(decode_entries(b"definitely not xml").is_err());
    }

    #[test]
    fn non_url_identifiers_are_not_links() {
        let entry = FeedEntry {
            title: "t".into(),
            link: Some("  ".into()),
            guid: Some("urn:uuid:1234".into()),
        };
        assert_eq!(entry.resolve_link(), None);

        let entry = FeedEntry {
            title: "t".into(),
            link: None,
            guid: None,
        };
        assert_eq!(entry.resolve_link(), None);
    }

    #[test]
    fn retry_policy_from_settings() {
        let settings = FetchSettings {
            retries: 4,
            retry_delay_seconds: 2,
            timeout_seconds: 10,
            user_agent: "ua".into(),
        };
        let policy = RetryPolicy::from_settings(&settings);
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.delay, Duration::from_secs(2));
        assert_eq!(RetryPolicy::immediate(3).delay, Duration::ZERO);
    }
}
