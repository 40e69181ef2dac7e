mod config;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod optimization;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{GeminiClient, ModelGateway, RetryPolicy};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Optimizer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize generation client and the retrying gateway in front of it
    let client = GeminiClient::from_config(&config)?;
    let gateway = ModelGateway::new(Arc::new(client), RetryPolicy::from_config(&config));
    let policy = gateway.policy();
    info!(
        "Model gateway initialized (model: {}, max_attempts: {}, backoff base: {}ms)",
        gateway.model(),
        policy.max_attempts,
        policy.base_delay.as_millis()
    );

    if config.cors_allowed_origins.is_empty() {
        info!("CORS: /api/* open to any origin");
    } else {
        info!("CORS: /api/* open to {:?}", config.cors_allowed_origins);
    }

    // Build app state
    let state = AppState {
        config: config.clone(),
        gateway,
    };

    // Build router
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
