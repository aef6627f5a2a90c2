mod board;
mod config;
mod errors;
mod models;
mod pipeline_client;
mod routes;
mod sessions;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::pipeline_client::HttpPipelineClient;
use crate::routes::build_router;
use crate::sessions::SessionStore;
use crate::state::AppState;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration first so the log level is known
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting stage board v{}", env!("CARGO_PKG_VERSION"));

    let api = HttpPipelineClient::new(
        config.pipeline_api_url.clone(),
        config.pipeline_api_token.clone(),
        config.pipeline_timeout(),
    );
    info!(
        "Pipeline client initialized ({}, timeout {}s)",
        config.pipeline_api_url, config.pipeline_timeout_secs
    );

    let sessions = Arc::new(SessionStore::new(config.session_idle_ttl()));
    sessions.spawn_sweeper(SESSION_SWEEP_INTERVAL);
    info!(
        "Board sessions expire after {}s idle",
        config.session_idle_ttl_secs
    );

    let state = AppState {
        api: Arc::new(api),
        sessions,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
