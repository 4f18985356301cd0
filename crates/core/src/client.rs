use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    config::DashboardConfig,
    error::{ApiError, ConfigError},
    types::{ArtifactDetail, ArtifactSummary, Build, BuildLog, DataEnvelope},
};

/// Read access to the build-automation API for a single app.
#[async_trait]
pub trait BuildSource: Send + Sync {
    /// First page of the app's builds, in API order.
    async fn list_builds(&self) -> Result<Vec<Build>, ApiError>;

    async fn build_log(&self, build_slug: &str) -> Result<BuildLog, ApiError>;

    async fn artifacts(&self, build_slug: &str) -> Result<Vec<ArtifactSummary>, ApiError>;

    async fn artifact_detail(
        &self,
        build_slug: &str,
        artifact_slug: &str,
    ) -> Result<ArtifactDetail, ApiError>;
}

/// HTTP client for the Bitrise v0.1 API.
#[derive(Clone)]
pub struct BitriseClient {
    http: reqwest::Client,
    api_base: String,
    app_slug: String,
    page_limit: Option<u32>,
}

impl BitriseClient {
    pub fn new(config: &DashboardConfig) -> Result<Self, ConfigError> {
        let mut token =
            HeaderValue::from_str(config.api_token()).map_err(|_| ConfigError::Invalid {
                field: "api_token".to_string(),
                value: "<redacted>".to_string(),
            })?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            app_slug: config.app_slug.clone(),
            page_limit: config.page_limit,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.api_base);
        debug!(endpoint = %path, "GET");

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: path.to_string(),
                source,
            })?;

        serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }

    fn builds_path(&self) -> String {
        format!("/apps/{}/builds", self.app_slug)
    }
}

#[async_trait]
impl BuildSource for BitriseClient {
    async fn list_builds(&self) -> Result<Vec<Build>, ApiError> {
        let mut query = Vec::new();
        if let Some(limit) = self.page_limit {
            query.push(("limit", limit.to_string()));
        }

        let page: DataEnvelope<Vec<Build>> = self.get_json(&self.builds_path(), &query).await?;
        Ok(page.data)
    }

    async fn build_log(&self, build_slug: &str) -> Result<BuildLog, ApiError> {
        let path = format!("{}/{build_slug}/log", self.builds_path());
        self.get_json(&path, &[]).await
    }

    async fn artifacts(&self, build_slug: &str) -> Result<Vec<ArtifactSummary>, ApiError> {
        let path = format!("{}/{build_slug}/artifacts", self.builds_path());
        let list: DataEnvelope<Vec<ArtifactSummary>> = self.get_json(&path, &[]).await?;
        Ok(list.data)
    }

    async fn artifact_detail(
        &self,
        build_slug: &str,
        artifact_slug: &str,
    ) -> Result<ArtifactDetail, ApiError> {
        let path = format!(
            "{}/{build_slug}/artifacts/{artifact_slug}",
            self.builds_path()
        );
        let detail: DataEnvelope<ArtifactDetail> = self.get_json(&path, &[]).await?;
        Ok(detail.data)
    }
}
