use std::{fmt, fs, path::Path, str::FromStr, time::Duration};

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://api.bitrise.io/v0.1";
pub const DEFAULT_WEB_BASE: &str = "https://app.bitrise.io";
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PORT: u16 = 7080;

pub const ENV_API_TOKEN: &str = "BITRISE_API_TOKEN";
pub const ENV_APP_SLUG: &str = "BITRISE_APP_SLUG";
pub const ENV_API_BASE: &str = "BUILDBOARD_API_BASE";
pub const ENV_WEB_BASE: &str = "BUILDBOARD_WEB_BASE";
pub const ENV_MAX_IN_FLIGHT: &str = "BUILDBOARD_MAX_IN_FLIGHT";
pub const ENV_PAGE_LIMIT: &str = "BUILDBOARD_PAGE_LIMIT";
pub const ENV_REQUEST_TIMEOUT: &str = "BUILDBOARD_REQUEST_TIMEOUT_SECS";
pub const ENV_PORT: &str = "BUILDBOARD_PORT";
pub const ENV_CONFIG_FILE: &str = "BUILDBOARD_CONFIG";

/// Raw contents of an optional buildboard.yaml file. Every key is optional
/// here; required values are checked once the environment is merged in.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_token: Option<String>,
    pub app_slug: Option<String>,
    pub api_base: Option<String>,
    pub web_base: Option<String>,
    pub max_in_flight: Option<usize>,
    pub page_limit: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub port: Option<u16>,
}

impl FileConfig {
    /// Loads a FileConfig from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// DashboardConfig holds everything the agent needs to talk to the API.
#[derive(Clone)]
pub struct DashboardConfig {
    api_token: String,
    pub app_slug: String,
    pub api_base: String,
    // Host used for synthesized build and download page links.
    pub web_base: String,
    pub max_in_flight: usize,
    // Forwarded as `limit` on the build list call. Only the first page is read.
    pub page_limit: Option<u32>,
    pub request_timeout: Duration,
    pub port: u16,
}

impl DashboardConfig {
    /// Creates a config with defaults for everything but the credentials.
    pub fn new(api_token: impl Into<String>, app_slug: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            app_slug: app_slug.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            web_base: DEFAULT_WEB_BASE.to_string(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            page_limit: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            port: DEFAULT_PORT,
        }
    }

    /// Reads the config from the process environment, plus the YAML file
    /// named by `BUILDBOARD_CONFIG` if set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolution order for each key:
    /// 1. The environment variable, if set and non-empty.
    /// 2. The config file named by `BUILDBOARD_CONFIG`, if any.
    /// 3. The built-in default (credentials have none).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let file = match var(ENV_CONFIG_FILE) {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };

        let api_token = var(ENV_API_TOKEN)
            .or(file.api_token)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField(ENV_API_TOKEN.to_string()))?;
        let app_slug = var(ENV_APP_SLUG)
            .or(file.app_slug)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField(ENV_APP_SLUG.to_string()))?;

        let mut config = Self::new(api_token.trim(), app_slug.trim());

        if let Some(base) = var(ENV_API_BASE).or(file.api_base) {
            config.api_base = normalize_base(&base);
        }
        if let Some(base) = var(ENV_WEB_BASE).or(file.web_base) {
            config.web_base = normalize_base(&base);
        }
        if let Some(n) = parse_var(&var, ENV_MAX_IN_FLIGHT)?.or(file.max_in_flight) {
            if n == 0 {
                return Err(ConfigError::Invalid {
                    field: ENV_MAX_IN_FLIGHT.to_string(),
                    value: n.to_string(),
                });
            }
            config.max_in_flight = n;
        }
        config.page_limit = parse_var(&var, ENV_PAGE_LIMIT)?.or(file.page_limit);
        if let Some(secs) = parse_var(&var, ENV_REQUEST_TIMEOUT)?.or(file.request_timeout_secs) {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(port) = parse_var(&var, ENV_PORT)?.or(file.port) {
            config.port = port;
        }

        Ok(config)
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = normalize_base(base);
        self
    }

    pub fn with_web_base(mut self, base: &str) -> Self {
        self.web_base = normalize_base(base);
        self
    }
}

// The token never ends up in logs.
impl fmt::Debug for DashboardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardConfig")
            .field("api_token", &"<redacted>")
            .field("app_slug", &self.app_slug)
            .field("api_base", &self.api_base)
            .field("web_base", &self.web_base)
            .field("max_in_flight", &self.max_in_flight)
            .field("page_limit", &self.page_limit)
            .field("request_timeout", &self.request_timeout)
            .field("port", &self.port)
            .finish()
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim().parse().map_err(|_| ConfigError::Invalid {
                field: key.to_string(),
                value: raw,
            })
        })
        .transpose()
}

fn normalize_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}
