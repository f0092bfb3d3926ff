//! Feed catalog: the categories of RSS sources scanned on every run.
//!
//! Order matters everywhere: categories and sources are processed and
//! rendered in declaration order.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single RSS/Atom source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

/// A labelled group of sources, rendered as one report section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    #[serde(default)]
    pub sources: Vec<FeedSource>,
}

/// Ordered list of categories (deserialized from TOML)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCatalog {
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl FeedCatalog {
    /// The default finance catalog.
    pub fn builtin() -> Self {
        fn category(label: &str, sources: &[(&str, &str)]) -> Category {
            Category {
                label: label.to_string(),
                sources: sources
                    .iter()
                    .map(|(name, url)| FeedSource {
                        name: name.to_string(),
                        url: url.to_string(),
                    })
                    .collect(),
            }
        }

        FeedCatalog {
            categories: vec![
                category("💲 华尔街见闻", &[("华尔街见闻", "https://dedicated.wallstreetcn.com/rss.xml")]),
                category("💻 36氪", &[("36氪", "https://36kr.com/feed")]),
                category(
                    "🇨🇳 中国经济",
                    &[
                        ("香港經濟日報", "https://www.hket.com/rss/china"),
                        ("东方财富", "http://rss.eastmoney.com/rss_partener.xml"),
                        ("百度股票焦点", "http://news.baidu.com/n?cmd=1&class=stock&tn=rss&sub=0"),
                        ("中新网", "https://www.chinanews.com.cn/rss/finance.xml"),
                        ("国家统计局-最新发布", "https://www.stats.gov.cn/sj/zxfb/rss.xml"),
                    ],
                ),
                category(
                    "🇺🇸 美国经济",
                    &[
                        ("华尔街日报 - 经济", "https://feeds.content.dowjones.io/public/rss/WSJcomUSBusiness"),
                        ("华尔街日报 - 市场", "https://feeds.content.dowjones.io/public/rss/RSSMarketsMain"),
                        ("MarketWatch美股", "https://www.marketwatch.com/rss/topstories"),
                        ("ZeroHedge华尔街新闻", "https://feeds.feedburner.com/zerohedge/feed"),
                        ("ETF Trends", "https://www.etftrends.com/feed/"),
                    ],
                ),
                category(
                    "🌍 世界经济",
                    &[
                        ("华尔街日报 - 经济", "https://feeds.content.dowjones.io/public/rss/socialeconomyfeed"),
                        ("BBC全球经济", "http://feeds.bbci.co.uk/news/business/rss.xml"),
                    ],
                ),
            ],
        }
    }

    /// Parse and validate a catalog from TOML text.
    pub fn from_toml_str(data: &str) -> Result<Self> {
        let catalog: FeedCatalog = toml::from_str(data).context("Failed to parse feed catalog TOML")?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog file asynchronously.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read feed catalog: {}", path.as_ref().display()))?;
        Self::from_toml_str(&data)
            .with_context(|| format!("Invalid feed catalog: {}", path.as_ref().display()))
    }

    pub fn source_count(&self) -> usize {
        self.categories.iter().map(|c| c.sources.len()).sum()
    }

    fn validate(&self) -> Result<()> {
        if self.source_count() == 0 {
            bail!("feed catalog defines no sources");
        }
        for category in &self.categories {
            for source in &category.sources {
                if source.url.trim().is_empty() {
                    bail!("source '{}' in category '{}' has an empty url", source.name, category.label);
                }
                url::Url::parse(source.url.trim())
                    .with_context(|| format!("source '{}' has an invalid url: {}", source.name, source.url))?;
            }
        }
        Ok(())
    }
}
