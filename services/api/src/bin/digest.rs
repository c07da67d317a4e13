//! services/api/src/bin/digest.rs
//!
//! Runs a single daily digest pass and exits. Meant to be invoked by an
//! external scheduler (cron, Cloud Scheduler, a Kubernetes CronJob).

use api_lib::{config::Config, error::ApiError, web::state::AppState};
use notebase_core::DAILY_INSIGHT_SAMPLE_SIZE;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::connect(config).await?;
    let report = state.dispatcher().run(DAILY_INSIGHT_SAMPLE_SIZE).await?;
    info!(?report, "Digest pass finished");
    Ok(())
}
