//! thermolog service - HTTP query API over date-partitioned readings.
//!
//! Run with: `cargo run -p thermolog-service`

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use thermolog_service::{AppState, Config, api};
use thermolog_store::Store;

/// thermolog service - HTTP query API over date-partitioned readings.
#[derive(Parser, Debug)]
#[command(name = "thermolog-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Database path (overrides config).
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Partition table prefix (overrides config).
    #[arg(long)]
    table_prefix: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("thermolog_service=info".parse()?)
                .add_directive("thermolog_store=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    // Override config with CLI args
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db_path) = args.database {
        config.storage.path = db_path;
    }
    if let Some(prefix) = args.table_prefix {
        config.storage.table_prefix = prefix;
    }

    config.validate()?;

    let store = Arc::new(Store::open(&config.storage.path)?);
    let state = AppState::from_config(store, &config);
    let app = api::app(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind.as_str()).await?;
    let addr = listener.local_addr()?;
    info!(
        "Serving partitions '{}<date>' on {} (max span {} days)",
        config.storage.table_prefix, addr, config.query.max_span_days
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
