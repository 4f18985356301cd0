// Module declarations
mod api;
mod state;
mod types;
mod workers;

use std::sync::Arc;

use anyhow::{Context, Result};
use buildboard_core::{BitriseClient, BuildEnricher, DashboardConfig, DashboardState};
use tokio::sync::{RwLock, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api::start_api,
    state::{AgentState, RefreshOutcome},
    workers::{RefreshJob, RefreshTrigger, RefreshWorker},
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = DashboardConfig::from_env().context("Failed to load configuration")?;
    info!(
        app_slug = %config.app_slug,
        api_base = %config.api_base,
        max_in_flight = config.max_in_flight,
        page_limit = ?config.page_limit,
        "Starting buildboardd"
    );

    let client = BitriseClient::new(&config).context("Failed to create API client")?;
    let enricher = BuildEnricher::new(client, &config);
    let dashboard = Arc::new(RwLock::new(DashboardState::default()));

    // Capacity 1: at most one fetch is ever queued or running.
    let (refresh_sender, refresh_receiver) = mpsc::channel::<RefreshJob>(1);

    let worker = RefreshWorker::new(enricher, Arc::clone(&dashboard));
    tokio::spawn(async move {
        if let Err(e) = worker.run(refresh_receiver).await {
            error!(error = %e, "Refresh worker error");
        }
    });

    let state = AgentState::new(dashboard, refresh_sender);
    match state.trigger_refresh(RefreshTrigger::Startup).await {
        RefreshOutcome::Accepted => {}
        outcome => warn!(?outcome, "Initial refresh was not queued"),
    }

    start_api(state, config.port).await
}

/// Installs the global tracing subscriber. `RUST_LOG` overrides the
/// default `info` level.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .ok();
}
