//! Herald API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use herald_common::config::AppConfig;

use herald_api::credentials::provision_credentials;
use herald_api::job::NotifyJob;
use herald_api::routes::create_router;
use herald_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "herald_api=info,herald_engine=info,herald_notifier=info,herald_sheets=info,tower_http=info",
            )
        }))
        .init();

    tracing::info!("Starting Herald API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    if let Some(json) = &config.google_credentials_json {
        provision_credentials(&config.credentials_file, json).await?;
    }
    if config.recipients.is_empty() {
        tracing::warn!("RECIPIENTS is empty; due records will be reported as undelivered");
    }
    if config.run_token.is_none() {
        tracing::warn!("RUN_TOKEN is not set; /run is open to anyone");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    // Build application state
    let job = Arc::new(NotifyJob::new(config.clone()));
    let state = AppState::new(config, job);

    // Build router
    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Start server
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    tracing::info!("Herald API server stopped.");
    Ok(())
}
