use serde::Serialize;

use crate::domain::DownloadMode;

/// Environment variable holding the download server's base URL.
pub const BASE_URL_ENV: &str = "MEDIA_API_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Body of `POST /download`
#[derive(Debug, Clone, Serialize)]
pub struct DownloadRequestBody<'a> {
    pub url: &'a str,
    #[serde(rename = "type")]
    pub kind: DownloadMode,
}

/// Configuration for the API client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Reads [`BASE_URL_ENV`], falling back to the local development server.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(BASE_URL_ENV).ok())
    }

    fn from_env_value(value: Option<String>) -> Self {
        match value {
            Some(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        }
    }

    pub fn download_endpoint(&self) -> String {
        format!("{}/download", self.base_url)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
