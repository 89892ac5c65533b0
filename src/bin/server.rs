//! binday HTTP server
//!
//! Serves lookups over HTTP. Logs are JSON lines filtered by `RUST_LOG`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use binday::{models::Config, pipeline::BinService, server};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Cache sweep period.
const PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config_path = std::env::var_os("BINDAY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/config.toml"));
    let config = Config::load_or_default(&config_path);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    if let Err(e) = config.validate() {
        error!("Config validation failed: {}", e);
        return Err(std::io::Error::other(e.to_string()));
    }

    info!("binday server starting with config {}", config_path.display());

    let service = Arc::new(BinService::new(config).map_err(|e| std::io::Error::other(e.to_string()))?);

    let sweeper = Arc::clone(&service);
    actix_web::rt::spawn(async move {
        let mut tick = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tick.tick().await;
            sweeper.purge_cache();
        }
    });

    server::run(service).await
}
