//! Open Corner server library

use anyhow::Context;
use corner_api::{start_server, AppState};
use corner_core::AppConfig;

/// Load configuration and serve the API until shutdown
pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("open_corner_lib=debug".parse()?)
                .add_directive("cpmm=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();

    tracing::info!("Starting Open Corner");

    let config = AppConfig::from_env().context("loading configuration")?;
    let port = config.api_port;
    let state = AppState::from_config(config).context("building application state")?;

    start_server(state, port)
        .await
        .with_context(|| format!("API server on port {} failed", port))
}
