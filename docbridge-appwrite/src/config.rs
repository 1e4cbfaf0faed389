//! Connection settings for an Appwrite project.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the API endpoint, e.g. `https://cloud.appwrite.io/v1`.
pub const ENDPOINT_VAR: &str = "APPWRITE_ENDPOINT";
pub const PROJECT_ID_VAR: &str = "APPWRITE_PROJECT_ID";
pub const API_KEY_VAR: &str = "APPWRITE_API_KEY";
pub const JWT_VAR: &str = "APPWRITE_JWT";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Raised when an [`AppwriteApi`](crate::AppwriteApi) cannot be configured.
#[derive(Error, Debug)]
pub enum AppwriteConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("invalid value for header `{0}`")]
    InvalidHeader(&'static str),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub type AppwriteConfigResult<T> = Result<T, AppwriteConfigError>;

/// Settings for one Appwrite project.
///
/// Deserializable from any serde format; missing optional fields take their
/// defaults.
///
/// ```ignore
/// let config: AppwriteConfig = serde_json::from_str(r#"{
///     "endpoint": "https://cloud.appwrite.io/v1",
///     "project_id": "demo",
///     "api_key": "secret"
/// }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppwriteConfig {
    /// Base URL of the REST API, including the `/v1` prefix.
    pub endpoint: String,
    pub project_id: String,
    /// Server API key, sent as `X-Appwrite-Key`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// User session JWT, sent as `X-Appwrite-JWT`.
    #[serde(default)]
    pub jwt: Option<String>,
    /// Locale for server-side messages, sent as `X-Appwrite-Locale`.
    #[serde(default)]
    pub locale: Option<String>,
    /// Accept self-signed TLS certificates (self-hosted development instances).
    #[serde(default)]
    pub self_signed: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl AppwriteConfig {
    pub fn new(endpoint: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            project_id: project_id.into(),
            api_key: None,
            jwt: None,
            locale: None,
            self_signed: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Reads the settings from `APPWRITE_ENDPOINT`, `APPWRITE_PROJECT_ID`,
    /// `APPWRITE_API_KEY` and `APPWRITE_JWT`.
    pub fn from_env() -> AppwriteConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppwriteConfigResult<Self> {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let endpoint = non_empty(ENDPOINT_VAR).ok_or(AppwriteConfigError::Missing(ENDPOINT_VAR))?;
        let project_id = non_empty(PROJECT_ID_VAR).ok_or(AppwriteConfigError::Missing(PROJECT_ID_VAR))?;

        Ok(Self {
            api_key: non_empty(API_KEY_VAR),
            jwt: non_empty(JWT_VAR),
            ..Self::new(endpoint, project_id)
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
