use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    enrich::FetchReport,
    filter::{self, FilterField, FilterSpec},
    types::EnrichedBuild,
};

/// Everything that can change the dashboard.
#[derive(Debug)]
pub enum DashboardEvent {
    FetchStarted,
    FetchSucceeded {
        report: FetchReport,
        fetched_at: DateTime<Utc>,
    },
    FetchFailed(String),
    FilterChanged(FilterField, String),
    FilterReplaced(FilterSpec),
}

/// Immutable snapshot of the dashboard. Every change goes through
/// [`DashboardState::reduce`], which returns a new snapshot.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    builds: Arc<[EnrichedBuild]>,
    visible: Arc<[EnrichedBuild]>,
    filter: FilterSpec,
    is_loading: bool,
    last_error: Option<String>,
    fetched_at: Option<DateTime<Utc>>,
    partial_failures: Vec<String>,
}

/// Summary of a [`DashboardState`] for status displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStatus {
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub build_count: usize,
    pub visible_count: usize,
    /// Slugs of builds whose install lookup failed in the last fetch.
    pub partial_failures: Vec<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn reduce(&self, event: DashboardEvent) -> Self {
        let mut next = self.clone();
        match event {
            DashboardEvent::FetchStarted => {
                next.is_loading = true;
            }
            DashboardEvent::FetchSucceeded { report, fetched_at } => {
                next.partial_failures = report
                    .partial_failures
                    .into_iter()
                    .map(|failure| failure.build_slug)
                    .collect();
                next.builds = report.builds.into();
                next.visible = filter::apply(&next.builds, &next.filter).into();
                next.last_error = None;
                next.fetched_at = Some(fetched_at);
                next.is_loading = false;
            }
            DashboardEvent::FetchFailed(message) => {
                next.last_error = Some(message);
                next.is_loading = false;
            }
            DashboardEvent::FilterChanged(field, value) => {
                next.filter = self.filter.with(field, value);
                next.visible = filter::apply(&next.builds, &next.filter).into();
            }
            DashboardEvent::FilterReplaced(spec) => {
                next.filter = spec;
                next.visible = filter::apply(&next.builds, &next.filter).into();
            }
        }
        next
    }

    /// Builds from the last successful fetch, in API order.
    pub fn builds(&self) -> &[EnrichedBuild] {
        &self.builds
    }

    /// Builds after the current filter and sort.
    pub fn visible(&self) -> &[EnrichedBuild] {
        &self.visible
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn find(&self, slug: &str) -> Option<&EnrichedBuild> {
        self.builds.iter().find(|b| b.slug == slug)
    }

    pub fn status(&self) -> DashboardStatus {
        DashboardStatus {
            is_loading: self.is_loading,
            last_error: self.last_error.clone(),
            build_count: self.builds.len(),
            visible_count: self.visible.len(),
            partial_failures: self.partial_failures.clone(),
            fetched_at: self.fetched_at,
        }
    }
}
