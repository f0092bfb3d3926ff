use common::FeedCatalog;
use std::time::Duration;
use tracing::{info, warn};

use crate::ingestion::RetryingFetcher;
use crate::schedule::Mode;
use crate::scraping::ArticleExtractor;

/// Counters for one run. Only ever incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub sources_ok: usize,
    pub sources_fail: usize,
    /// Entries rendered into the report
    pub items_kept: usize,
    /// Entries looked at after the per-source cap, including link-less ones
    pub items_total_seen: usize,
    /// Entries whose article body was scraped successfully
    pub body_ok: usize,
}

/// Rendered news listing of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDigest {
    pub label: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct AggregationResult {
    /// Non-blank categories only, in catalog order
    pub categories: Vec<CategoryDigest>,
    /// Concatenated article bodies, Full mode only
    pub analysis_text: String,
    pub stats: RunStats,
}

/// Walks the catalog sequentially: category, then source, then entry.
pub struct AggregationPipeline {
    fetcher: RetryingFetcher,
    extractor: ArticleExtractor,
    entry_delay: Duration,
}

impl AggregationPipeline {
    pub fn new(fetcher: RetryingFetcher, extractor: ArticleExtractor, entry_delay: Duration) -> Self {
        Self {
            fetcher,
            extractor,
            entry_delay,
        }
    }

    pub async fn run(&self, catalog: &FeedCatalog, mode: Mode, max_per_source: usize) -> AggregationResult {
        let mut result = AggregationResult::default();

        for category in &catalog.categories {
            let mut category_content = String::new();

            for source in &category.sources {
                info!("Fetching {} ({})", source.name, source.url);
                let entries = match self.fetcher.fetch(&source.url).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!(source = %source.name, "source skipped: {:#}", e);
                        result.stats.sources_fail += 1;
                        continue;
                    }
                };
                result.stats.sources_ok += 1;
                info!("{} fetched, {} entries", source.name, entries.len());

                let mut lines = Vec::new();
                for entry in entries.iter().take(max_per_source) {
                    result.stats.items_total_seen += 1;

                    let Some(link) = entry.resolve_link() else {
                        warn!(source = %source.name, "entry '{}' has no link, skipped", entry.title);
                        continue;
                    };

                    if mode.fetches_bodies() {
                        let body = self.extractor.extract(link).await;
                        if !body.is_empty() {
                            result.stats.body_ok += 1;
                            result.analysis_text.push_str(&body);
                            result.analysis_text.push_str("\n\n");
                        }
                    }

                    result.stats.items_kept += 1;
                    lines.push(format!("- [{}]({})", entry.title, link));

                    if !self.entry_delay.is_zero() {
                        tokio::time::sleep(self.entry_delay).await;
                    }
                }

                if !lines.is_empty() {
                    category_content.push_str(&format!("### {}\n{}\n\n", source.name, lines.join("\n")));
                }
            }

            if !category_content.trim().is_empty() {
                result.categories.push(CategoryDigest {
                    label: category.label.clone(),
                    content: category_content,
                });
            }
        }

        info!(
            sources_ok = result.stats.sources_ok,
            sources_fail = result.stats.sources_fail,
            items_kept = result.stats.items_kept,
            items_total_seen = result.stats.items_total_seen,
            body_ok = result.stats.body_ok,
            "aggregation finished"
        );
        result
    }
}
