use std::sync::Arc;

use buildboard_core::{DashboardEvent, DashboardState, FilterField, FilterSpec};
use tokio::sync::{
    RwLock,
    mpsc::{Sender, error::TrySendError},
};

use crate::workers::{RefreshJob, RefreshTrigger};

/// Result of asking for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Accepted,
    /// A fetch is already queued or running; fetches never overlap.
    AlreadyRunning,
    WorkerStopped,
}

#[derive(Clone)]
pub struct AgentState {
    dashboard: Arc<RwLock<DashboardState>>,
    refresh_queue: Sender<RefreshJob>,
}

impl AgentState {
    pub fn new(dashboard: Arc<RwLock<DashboardState>>, refresh_queue: Sender<RefreshJob>) -> Self {
        Self {
            dashboard,
            refresh_queue,
        }
    }

    /// Current dashboard snapshot. Cheap: the build lists are shared.
    pub async fn snapshot(&self) -> DashboardState {
        self.dashboard.read().await.clone()
    }

    pub async fn trigger_refresh(&self, trigger: RefreshTrigger) -> RefreshOutcome {
        // Check and mark under one write lock so two requests cannot both start a fetch.
        let mut dashboard = self.dashboard.write().await;
        if dashboard.is_loading() {
            return RefreshOutcome::AlreadyRunning;
        }

        match self.refresh_queue.try_send(RefreshJob { trigger }) {
            Ok(()) => {
                *dashboard = dashboard.reduce(DashboardEvent::FetchStarted);
                RefreshOutcome::Accepted
            }
            Err(TrySendError::Full(_)) => RefreshOutcome::AlreadyRunning,
            Err(TrySendError::Closed(_)) => RefreshOutcome::WorkerStopped,
        }
    }

    pub async fn update_filter(&self, field: FilterField, value: String) -> FilterSpec {
        let mut dashboard = self.dashboard.write().await;
        *dashboard = dashboard.reduce(DashboardEvent::FilterChanged(field, value));
        dashboard.filter().clone()
    }

    pub async fn replace_filter(&self, spec: FilterSpec) -> FilterSpec {
        let mut dashboard = self.dashboard.write().await;
        *dashboard = dashboard.reduce(DashboardEvent::FilterReplaced(spec));
        dashboard.filter().clone()
    }
}
