//! Core of buildboard: fetching and enriching CI builds from the Bitrise API,
//! and filtering/sorting them for display.

pub mod client;
pub mod config;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod state;
pub mod types;

pub use client::{BitriseClient, BuildSource};
pub use config::DashboardConfig;
pub use enrich::{BuildEnricher, FetchReport};
pub use filter::{FilterField, FilterOverrides, FilterSpec, SortBy};
pub use state::{DashboardEvent, DashboardState, DashboardStatus};
pub use types::{BuildStatus, EnrichedBuild};
