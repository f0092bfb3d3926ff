//! One digest run: aggregate, summarize, format, deliver.

use anyhow::Result;
use chrono::{DateTime, Utc};
use common::{Config, FeedCatalog};
use std::sync::Arc;
use tracing::{info, warn};

use crate::ingestion::{FeedTransport, HttpFeedTransport, RetryPolicy, RetryingFetcher};
use crate::llm::remote::RemoteLlmProvider;
use crate::llm::{LlmProvider, Summarizer};
use crate::pipeline::AggregationPipeline;
use crate::push::{DeliverySummary, Dispatcher, HttpPushTransport, PushTransport};
use crate::report::{format_report, Report, ReportInput};
use crate::schedule::{report_date, Mode};
use crate::scraping::{ArticleExtractor, ArticleSource, ReadabilityExtractor};

/// The four network boundaries of a run.
#[derive(Clone)]
pub struct Services {
    pub feeds: Arc<dyn FeedTransport>,
    pub articles: Arc<dyn ArticleSource>,
    pub llm: Arc<dyn LlmProvider>,
    pub push: Arc<dyn PushTransport>,
}

impl Services {
    /// Production HTTP implementations.
    pub fn http(config: &Config) -> Result<Self> {
        Ok(Self {
            feeds: Arc::new(HttpFeedTransport::new(&config.fetch)?),
            articles: Arc::new(ReadabilityExtractor::new(&config.fetch)?),
            llm: Arc::new(RemoteLlmProvider::from_settings(&config.llm)),
            push: Arc::new(HttpPushTransport::new(Dispatcher::TIMEOUT)?),
        })
    }
}

/// Collect the news and assemble the report for the edition due at `now`.
pub async fn build_report(config: &Config, catalog: &FeedCatalog, services: &Services, now: DateTime<Utc>) -> Report {
    let mode = Mode::at(now);
    let date = report_date(now);
    let max_per_source = mode.max_per_source(&config.limits);
    info!(?mode, %date, max_per_source, sources = catalog.source_count(), "starting digest run");

    let pipeline = AggregationPipeline::new(
        RetryingFetcher::new(services.feeds.clone(), RetryPolicy::from_settings(&config.fetch)),
        ArticleExtractor::new(services.articles.clone(), config.limits.article_max_len),
        config.limits.entry_delay(),
    );
    let aggregation = pipeline.run(catalog, mode, max_per_source).await;

    let summary = match mode {
        Mode::Full => {
            let summarizer = Summarizer::new(services.llm.clone(), config.limits.report_max_chars);
            Some(summarizer.summarize(&aggregation.analysis_text).await)
        }
        Mode::Lite => None,
    };

    format_report(&ReportInput {
        date: &date,
        mode,
        stats: &aggregation.stats,
        summary: summary.as_deref(),
        categories: &aggregation.categories,
    })
}

/// Build the report and push it to every configured key.
pub async fn run_once(
    config: &Config,
    catalog: &FeedCatalog,
    services: &Services,
    now: DateTime<Utc>,
) -> (Report, DeliverySummary) {
    let report = build_report(config, catalog, services, now).await;
    let delivery = deliver(config, services, &report).await;
    (report, delivery)
}

pub async fn deliver(config: &Config, services: &Services, report: &Report) -> DeliverySummary {
    let dispatcher = Dispatcher::new(config.push.clone(), services.push.clone());
    let summary = dispatcher.deliver(&report.title, &report.body).await;
    if summary.failed > 0 {
        warn!(delivered = summary.delivered, failed = summary.failed, "some pushes failed");
    } else {
        info!(delivered = summary.delivered, "report delivered");
    }
    summary
}
