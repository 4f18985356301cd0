use std::{fmt, sync::Arc};

use anyhow::Result;
use buildboard_core::{BuildEnricher, BuildSource, DashboardEvent, DashboardState};
use chrono::Utc;
use tokio::sync::{RwLock, mpsc::Receiver};
use tracing::{error, info, warn};

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Startup,
    Manual,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshTrigger::Startup => write!(f, "startup"),
            RefreshTrigger::Manual => write!(f, "manual"),
        }
    }
}

pub struct RefreshJob {
    pub trigger: RefreshTrigger,
}

/// Runs fetches one at a time and folds their results into the dashboard.
pub struct RefreshWorker<S> {
    enricher: BuildEnricher<S>,
    dashboard: Arc<RwLock<DashboardState>>,
}

impl<S: BuildSource> RefreshWorker<S> {
    pub fn new(enricher: BuildEnricher<S>, dashboard: Arc<RwLock<DashboardState>>) -> Self {
        Self {
            enricher,
            dashboard,
        }
    }

    /// Runs the refresh worker, processing refresh jobs from the channel.
    pub async fn run(&self, mut refresh_rx: Receiver<RefreshJob>) -> Result<()> {
        info!("Refresh worker started");

        while let Some(job) = refresh_rx.recv().await {
            info!(trigger = %job.trigger, "Processing refresh job");
            self.process_refresh().await;
        }

        info!("Refresh worker stopped (channel closed)");
        Ok(())
    }

    async fn process_refresh(&self) {
        let event = match self.enricher.fetch_and_enrich().await {
            Ok(report) => {
                for failure in &report.partial_failures {
                    warn!(
                        build_slug = %failure.build_slug,
                        error = %failure.error,
                        "Install lookup failed; install links left empty"
                    );
                }
                info!(builds = report.builds.len(), "Refresh completed");
                DashboardEvent::FetchSucceeded {
                    report,
                    fetched_at: Utc::now(),
                }
            }
            Err(e) => {
                // Previous builds stay on display.
                error!(error = %e, "Refresh failed");
                DashboardEvent::FetchFailed(e.to_string())
            }
        };

        let mut dashboard = self.dashboard.write().await;
        *dashboard = dashboard.reduce(event);
    }
}
