use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status of a build as reported by the API.
///
/// Known values get their own variant; anything else is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildStatus {
    Success,
    Error,
    InProgress,
    Other(String),
}

/// Coarse classification used when rendering a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Passed,
    Failed,
    Pending,
}

impl BuildStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BuildStatus::Success => "success",
            BuildStatus::Error => "error",
            BuildStatus::InProgress => "in-progress",
            BuildStatus::Other(s) => s,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success)
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            BuildStatus::Success => StatusTone::Passed,
            BuildStatus::Error => StatusTone::Failed,
            _ => StatusTone::Pending,
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Matching is exact: "Success" is not "success".
impl From<&str> for BuildStatus {
    fn from(s: &str) -> Self {
        match s {
            "success" => BuildStatus::Success,
            "error" => BuildStatus::Error,
            "in-progress" => BuildStatus::InProgress,
            other => BuildStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for BuildStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "success" | "error" | "in-progress" => BuildStatus::from(s.as_str()),
            _ => BuildStatus::Other(s),
        }
    }
}

impl From<BuildStatus> for String {
    fn from(status: BuildStatus) -> Self {
        match status {
            BuildStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for StatusTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusTone::Passed => "passed",
            StatusTone::Failed => "failed",
            StatusTone::Pending => "pending",
        };
        write!(f, "{label}")
    }
}

/// A build record as returned by `GET /apps/{app}/builds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub slug: String,
    pub build_number: u64,
    pub status_text: BuildStatus,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub commit_message: Option<String>,
    #[serde(default)]
    pub triggered_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_url: Option<String>,
    /// Every other field of the API record, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Install-related fields resolved from a build's artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallLinks {
    pub public_install_page_url: Option<String>,
    pub bitrise_download_page_url: Option<String>,
    pub app_title: Option<String>,
}

/// A build after enrichment. Replaced wholesale on every fetch, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBuild {
    pub slug: String,
    pub build_number: u64,
    pub status_text: BuildStatus,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub commit_message: Option<String>,
    #[serde(default)]
    pub triggered_at: String,
    pub build_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
    #[serde(default)]
    pub public_install_page_url: Option<String>,
    #[serde(default)]
    pub bitrise_download_page_url: Option<String>,
    #[serde(default)]
    pub app_title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EnrichedBuild {
    /// Merges a raw build with its looked-up fields.
    pub fn assemble(
        build: Build,
        build_url: String,
        log_url: Option<String>,
        install: InstallLinks,
    ) -> Self {
        Self {
            slug: build.slug,
            build_number: build.build_number,
            status_text: build.status_text,
            branch: build.branch,
            commit_message: build.commit_message,
            triggered_at: build.triggered_at,
            build_url,
            log_url,
            public_install_page_url: install.public_install_page_url,
            bitrise_download_page_url: install.bitrise_download_page_url,
            app_title: install.app_title,
            extra: build.extra,
        }
    }

    /// `triggered_at` as a timestamp, if it parses as RFC 3339.
    pub fn triggered_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.triggered_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// `{ "data": ... }` wrapper used by most API responses.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildLog {
    #[serde(default)]
    pub expiring_raw_log_url: Option<String>,
}

/// One entry of a build's artifact list.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactSummary {
    pub slug: String,
    /// `None` when the key is absent, `Some(None)` when it is `null`.
    #[serde(default, deserialize_with = "present")]
    pub artifact_meta: Option<Option<Value>>,
}

impl ArtifactSummary {
    /// Only an explicit `null` disqualifies an artifact.
    pub fn has_meta(&self) -> bool {
        !matches!(self.artifact_meta, Some(None))
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<Value>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactDetail {
    #[serde(default)]
    pub public_install_page_url: Option<String>,
    #[serde(default)]
    pub artifact_meta: Option<Value>,
}

impl ArtifactDetail {
    /// `artifact_meta.app_info.app_title`, when every level is present.
    pub fn app_title(&self) -> Option<&str> {
        self.artifact_meta
            .as_ref()?
            .pointer("/app_info/app_title")?
            .as_str()
            .filter(|title| !title.is_empty())
    }

    pub fn install_page_url(&self) -> Option<&str> {
        self.public_install_page_url
            .as_deref()
            .filter(|url| !url.is_empty())
    }
}
