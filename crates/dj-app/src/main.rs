mod backend;
mod config;
mod error;
mod generator;
mod provider;

use tracing_subscriber::EnvFilter;
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;
    backend::serve(config).await
}
