use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading the dashboard configuration.
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the config file
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Error parsing the YAML
    #[error("Parse error: {0}")]
    Parse(String),
    /// Required value is missing or empty
    #[error("Missing required configuration: {0}")]
    MissingField(String),
    /// Value present but unusable
    #[error("Invalid value for {field}: {value}")]
    Invalid { field: String, value: String },
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// A single call against the build-automation API failed.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

/// Failure that aborts a whole fetch cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to list builds: {0}")]
    BuildList(#[source] ApiError),
    #[error("failed to fetch log for build {slug}: {source}")]
    Log {
        slug: String,
        #[source]
        source: ApiError,
    },
    #[error("fetch was cancelled before every build was enriched")]
    Cancelled,
}

/// Failure of the install lookup for one build. Never aborts the batch.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("failed to list artifacts for build {slug}: {source}")]
    Artifacts {
        slug: String,
        #[source]
        source: ApiError,
    },
    #[error("failed to fetch artifact {artifact_slug} of build {slug}: {source}")]
    ArtifactDetail {
        slug: String,
        artifact_slug: String,
        #[source]
        source: ApiError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown filter field: {0}. Valid options: status, branch, app_title, buildNumber, sortBy")]
pub struct UnknownFilterField(pub String);
