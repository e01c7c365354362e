use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

mod analysis;
mod api;
mod cache;
mod chunker;
mod config;
mod error;
mod models;
mod progress;
mod retry;
mod service;
mod store;
mod websocket;

use crate::analysis::SimulatedAnalysisBackend;
use crate::config::StaticConfig;
use crate::service::AnalyzerService;

// The crate-level `config` module shadows the registry crate of the same name.
use ::config::{Config as ConfigBuilder, Environment, File};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!(
        "Starting document analyzer service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let static_config: StaticConfig = ConfigBuilder::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(
            Environment::with_prefix("ANALYZER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    info!(
        host = %static_config.server.host,
        port = static_config.server.port,
        "Configuration loaded"
    );

    let config = Arc::new(static_config);
    let backend = Arc::new(SimulatedAnalysisBackend::new(config.analysis.clone()));
    let service = Arc::new(AnalyzerService::new(config.clone(), backend));

    let app = api::router(service);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

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
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("analyzer_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
