mod form;
mod routes;
mod schemas;
mod state;

use std::sync::Arc;
use std::time::Duration;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use dj_core::MemoryJobStore;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use crate::config::AppConfig;
use crate::backend::routes::api_routes;
use crate::backend::state::GenState;
use crate::generator::Generator;
use crate::provider::StabilityClient;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

pub fn router(state: Arc<GenState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .merge(api_routes())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let provider = Arc::new(StabilityClient::new(&config.provider)?);
    let store = Arc::new(MemoryJobStore::new(config.job_ttl));
    let generator = Generator::new(config.api_key.clone(), provider.clone(), store);

    if !generator.is_configured() {
        warn!("STABILITY_API_KEY is not set; generation requests will fail until it is configured");
    }

    let state = Arc::new(GenState::new(generator));
    spawn_purge_task(state.clone());

    let app = router(state, config.max_upload_bytes);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Starting server on port {}", config.port);
    info!("Forwarding generation requests to {}", provider.endpoint());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn spawn_purge_task(state: Arc<GenState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = state.generator.purge_expired_jobs() {
                error!("Failed to purge expired jobs: {}", e);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
