use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mdingest_rs::config::Settings;
use mdingest_rs::decoder::json::JsonFileDecoder;
use mdingest_rs::pipeline::Pipeline;
use mdingest_rs::telemetry;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "mdingest", about = "Decode downloaded raw market-data files")]
struct Args {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `data_dir` from settings
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Overrides `log_filter` from settings (RUST_LOG still wins)
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    if let Some(dir) = args.data_dir {
        settings.data_dir = dir;
    }
    if let Some(filter) = args.log_filter {
        settings.log_filter = filter;
    }

    telemetry::init_tracing(&settings.log_filter);
    telemetry::init_metrics();

    let layout = settings.layout();
    let registry = Arc::new(settings.registry());
    info!(markets = registry.len(), data_dir = %layout.root.display(), "settings loaded");

    let decoder = Arc::new(JsonFileDecoder::new(layout.clone()));
    let running = Pipeline::new(layout, registry, decoder).start().await;

    // In-flight work is abandoned on exit; the next start re-scans
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!(queued = running.scan.submitted, inflight = running.inflight(), "shutting down");
    Ok(())
}
