//! autotag-svc - Image Auto-Tagging Service
//!
//! Long-running HTTP service: synchronous single-image tagging, asynchronous
//! folder batch jobs with progress polling, tags persisted via ExifTool.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use autotag_svc::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "autotag-svc", version, about = "Image auto-tagging service")]
struct Args {
    /// Path to config file (default: ~/.config/autotag/config.toml)
    #[arg(short, long, env = "AUTOTAG_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut config = autotag_common::ServiceConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.service.host = host;
    }
    if let Some(port) = args.port {
        config.service.port = port;
    }

    info!("Starting autotag-svc (Image Auto-Tagging Service)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Tagging defaults: mode={}, min_confidence={}%",
        config.tagging.default_tag_mode, config.tagging.min_confidence_percent
    );
    info!("ExifTool: {}", config.writer.exiftool_path);
    info!("Models dir: {}", config.classifiers.models_dir.display());

    let addr = format!("{}:{}", config.service.host, config.service.port);
    let state = AppState::new(config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
