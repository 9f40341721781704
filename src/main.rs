use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use activity_photo_cam::{
    cache::RotatingImageCache,
    config::Config,
    entity::PhotoCamera,
    events::{EventBus, spawn_ingestion_listener},
    fetcher::HttpImageFetcher,
    scheduler::RotationScheduler,
    web::{AppState, WebServer},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "activity-photo-cam")]
#[command(version)]
#[command(about = "A rotating photo-gallery camera fed by activity image URLs")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(cli: &Cli) {
    let log_filter = if cli.log_level == "trace" {
        format!("activity_photo_cam={},tower_http=trace", cli.log_level)
    } else {
        format!("activity_photo_cam={}", cli.log_level)
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_filter.into());

    match cli.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    info!("Starting activity-photo-cam v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    let fetcher = Arc::new(HttpImageFetcher::new(&config.http)?);
    let cache = Arc::new(RotatingImageCache::open(&config.photos, fetcher)?);
    cache.log_summary().await;

    let camera = Arc::new(PhotoCamera::new(cache.clone(), config.photos.enabled));
    if !config.photos.enabled {
        info!("Photo camera registered but disabled by default");
    }

    let shutdown = CancellationToken::new();
    let bus = EventBus::default();

    let listener = spawn_ingestion_listener(&bus, cache.clone(), shutdown.clone());
    let scheduler = RotationScheduler::new(cache.clone(), config.photos.rotation_interval)
        .spawn(shutdown.clone());

    let server = WebServer::new(&config.web, AppState { camera, bus })?;

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let served = server.serve(shutdown.clone()).await;
    shutdown.cancel();

    let _ = tokio::join!(listener, scheduler);
    info!("Shutdown complete");
    served
}
