//! Build enrichment.
//!
//! A fetch lists the app's builds and then runs one lookup chain per build:
//! the log lookup always, and for successful builds the artifact list and
//! artifact detail lookups. Chains run concurrently, bounded by
//! `max_in_flight`.
//!
//! Failure handling is asymmetric:
//! - a failed build list or log lookup fails the whole fetch;
//! - a failed artifact lookup only leaves that build's install fields empty.

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::{
    client::BuildSource,
    config::DashboardConfig,
    error::{EnrichError, FetchError},
    types::{ArtifactSummary, Build, EnrichedBuild, InstallLinks},
};

/// What happened to the install lookup of one build.
#[derive(Debug)]
pub enum InstallLookup {
    /// Build did not succeed, so artifacts were not looked up.
    Skipped,
    /// No artifact carried metadata.
    NoQualifyingArtifact,
    Resolved(InstallLinks),
    Failed(EnrichError),
}

impl InstallLookup {
    pub fn links(&self) -> Option<&InstallLinks> {
        match self {
            InstallLookup::Resolved(links) => Some(links),
            _ => None,
        }
    }
}

/// Per-build result of a fetch.
#[derive(Debug)]
pub struct BuildOutcome {
    pub build: EnrichedBuild,
    pub install: InstallLookup,
}

#[derive(Debug)]
pub struct PartialFailure {
    pub build_slug: String,
    pub error: EnrichError,
}

/// Result of a successful fetch: builds in API order plus the install
/// lookups that failed along the way.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub builds: Vec<EnrichedBuild>,
    pub partial_failures: Vec<PartialFailure>,
}

impl FromIterator<BuildOutcome> for FetchReport {
    fn from_iter<I: IntoIterator<Item = BuildOutcome>>(outcomes: I) -> Self {
        let mut report = FetchReport::default();
        for outcome in outcomes {
            if let InstallLookup::Failed(error) = outcome.install {
                report.partial_failures.push(PartialFailure {
                    build_slug: outcome.build.slug.clone(),
                    error,
                });
            }
            report.builds.push(outcome.build);
        }
        report
    }
}

pub struct BuildEnricher<S> {
    source: S,
    app_slug: String,
    web_base: String,
    max_in_flight: usize,
}

impl<S: BuildSource> BuildEnricher<S> {
    pub fn new(source: S, config: &DashboardConfig) -> Self {
        Self {
            source,
            app_slug: config.app_slug.clone(),
            web_base: config.web_base.clone(),
            max_in_flight: config.max_in_flight.max(1),
        }
    }

    /// Fetches the build list and enriches every build.
    ///
    /// # Errors
    ///
    /// Returns an error if the build list or any build's log lookup fails.
    /// Nothing is returned for the builds that did succeed.
    pub async fn fetch_and_enrich(&self) -> Result<FetchReport, FetchError> {
        let outcomes = self.fetch_outcomes().await?;
        let report: FetchReport = outcomes.into_iter().collect();

        info!(
            builds = report.builds.len(),
            partial_failures = report.partial_failures.len(),
            "Enrichment finished"
        );
        Ok(report)
    }

    /// Like [`fetch_and_enrich`](Self::fetch_and_enrich), but keeps the
    /// per-build install lookup outcome.
    pub async fn fetch_outcomes(&self) -> Result<Vec<BuildOutcome>, FetchError> {
        let builds = self
            .source
            .list_builds()
            .await
            .map_err(FetchError::BuildList)?;
        info!(app_slug = %self.app_slug, builds = builds.len(), "Fetched build list");

        let semaphore = Semaphore::new(self.max_in_flight);
        try_join_all(
            builds
                .into_iter()
                .map(|build| self.enrich_build(build, &semaphore)),
        )
        .await
    }

    async fn enrich_build(
        &self,
        build: Build,
        semaphore: &Semaphore,
    ) -> Result<BuildOutcome, FetchError> {
        // The semaphore lives for the whole fetch and is never closed.
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::Cancelled)?;

        let log = self
            .source
            .build_log(&build.slug)
            .await
            .map_err(|source| FetchError::Log {
                slug: build.slug.clone(),
                source,
            })?;

        let install = if build.status_text.is_success() {
            self.lookup_install(&build.slug).await
        } else {
            InstallLookup::Skipped
        };
        debug!(build_slug = %build.slug, install = ?install, "Enriched build");

        let build_url = self.build_url_for(&build);
        let links = install.links().cloned().unwrap_or_default();

        Ok(BuildOutcome {
            build: EnrichedBuild::assemble(build, build_url, log.expiring_raw_log_url, links),
            install,
        })
    }

    async fn lookup_install(&self, build_slug: &str) -> InstallLookup {
        match self.resolve_install(build_slug).await {
            Ok(Some(links)) => InstallLookup::Resolved(links),
            Ok(None) => InstallLookup::NoQualifyingArtifact,
            Err(e) => InstallLookup::Failed(e),
        }
    }

    async fn resolve_install(&self, build_slug: &str) -> Result<Option<InstallLinks>, EnrichError> {
        let artifacts =
            self.source
                .artifacts(build_slug)
                .await
                .map_err(|source| EnrichError::Artifacts {
                    slug: build_slug.to_string(),
                    source,
                })?;

        // First in API order wins.
        let Some(artifact) = artifacts.into_iter().find(ArtifactSummary::has_meta) else {
            return Ok(None);
        };

        let detail = self
            .source
            .artifact_detail(build_slug, &artifact.slug)
            .await
            .map_err(|source| EnrichError::ArtifactDetail {
                slug: build_slug.to_string(),
                artifact_slug: artifact.slug.clone(),
                source,
            })?;

        Ok(Some(InstallLinks {
            public_install_page_url: detail.install_page_url().map(str::to_owned),
            bitrise_download_page_url: Some(self.download_page_url(&artifact.slug)),
            app_title: detail.app_title().map(str::to_owned),
        }))
    }

    fn build_url_for(&self, build: &Build) -> String {
        match build.build_url.as_deref() {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!("{}/build/{}", self.web_base, build.slug),
        }
    }

    fn download_page_url(&self, artifact_slug: &str) -> String {
        format!(
            "{}/app/{}/installable-artifacts/{artifact_slug}",
            self.web_base, self.app_slug
        )
    }
}
