/*
financebot - single-run binary.
Fetches the finance feeds, builds the morning (full) or evening (lite) report
and pushes it to every configured key. Meant to be started by an external
scheduler (cron, CI schedule) a couple of times a day.
*/

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use common::{Config, FeedCatalog};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use financebot::worker::{self, Services};

#[derive(Parser, Debug)]
#[command(name = "financebot", about = "Finance news digest: RSS aggregation, AI brief, push delivery")]
struct Args {
    /// TOML feed catalog replacing the built-in list
    #[arg(long, value_name = "FILE")]
    feeds: Option<PathBuf>,

    /// Print the report to stdout instead of pushing it
    #[arg(long)]
    dry_run: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Values already in the environment take precedence over .env
    if let Ok(path) = dotenv::dotenv() {
        info!(path = ?path, "loaded .env file");
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "invalid configuration");
            return Err(e);
        }
    };
    info!(
        model = %config.llm.model,
        push_keys = config.push.keys.len(),
        "configuration loaded"
    );

    let catalog = match &args.feeds {
        Some(path) => FeedCatalog::from_file(path).await.map_err(|e| {
            error!(path = ?path, "failed to load feed catalog: {:#}", e);
            e
        })?,
        None => FeedCatalog::builtin(),
    };

    let services = Services::http(&config)?;
    let now = Utc::now();

    if args.dry_run {
        let report = worker::build_report(&config, &catalog, &services, now).await;
        println!("{}\n\n{}", report.title, report.body);
        info!("dry run: report not pushed");
        return Ok(());
    }

    let (report, delivery) = worker::run_once(&config, &catalog, &services, now).await;
    info!(
        title = %report.title,
        delivered = delivery.delivered,
        failed = delivery.failed,
        "digest run finished"
    );
    Ok(())
}
