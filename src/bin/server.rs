//! HTTP server for the question-answering pipeline.

use anyhow::Result;
use clap::Parser;
use qna_engine::config::Settings;
use qna_engine::pipeline::QaPipeline;
use qna_engine::server::{serve, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Serve /api/health and /api/questions over HTTP")]
struct Args {
    /// Listen address (defaults to SERVER_ADDR or 0.0.0.0:8080)
    #[arg(long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let settings = Settings::from_env()?;
    let addr = args.addr.unwrap_or_else(|| settings.server_addr.clone());

    info!("Starting {} v{}", settings.api_title, settings.api_version);
    let state = Arc::new(AppState {
        pipeline: QaPipeline::from_settings(&settings).await?,
        title: settings.api_title.clone(),
        version: settings.api_version.clone(),
    });

    serve(&addr, state).await?;
    Ok(())
}
