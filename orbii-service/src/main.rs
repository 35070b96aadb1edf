use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

mod api;
mod config;
mod db;
mod error;
mod i18n;
mod inference;
mod roadmap;
mod service;

use crate::config::OrbiiConfig;
use crate::db::Database;
use crate::inference::OllamaClient;
use crate::service::OrbiiService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!("Starting Orbii service v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(OrbiiConfig::load()?);
    info!(
        host = %config.server.host,
        port = config.server.port,
        model = %config.inference.model,
        "Configuration loaded"
    );

    // Ensure data directory exists
    std::fs::create_dir_all(&config.storage.data_dir)?;

    // Initialize database
    let db_path = config.storage.data_dir.join("orbii.db");
    let db = Arc::new(Database::open(&db_path)?);
    info!(path = %db_path.display(), "Database initialized");

    let inference = Arc::new(OllamaClient::new(config.inference.clone())?);
    let service = Arc::new(OrbiiService::new(config.clone(), db, inference));

    // Build the router
    let app = api::router(service.clone());

    // Start session cleanup background task
    if config.session.ttl_secs > 0 {
        let cleanup_service = service.clone();
        let cleanup_interval = config.session.cleanup_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);
            loop {
                interval.tick().await;
                match cleanup_service.cleanup_sessions() {
                    Ok(count) if count > 0 => {
                        info!(removed = count, "Cleaned up stale sessions");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Session cleanup failed");
                    }
                    _ => {}
                }
            }
        });
    }

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(assets = %config.assets.dir.display(), "Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("orbii_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
