use std::time::Duration;

use futures::{stream::BoxStream, StreamExt, TryStreamExt};
use reqwest::{header, Client};
use thiserror::Error;
use tracing::{debug, info};

use super::models::{ApiConfig, DownloadRequestBody};
use crate::domain::{AppError, DownloadRequest};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Server returned an empty response body")]
    EmptyBody,
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, body } => AppError::Request {
                status,
                message: body,
            },
            ApiError::EmptyBody => AppError::EmptyBody,
            ApiError::RequestError(e) => AppError::Network(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

// The read failure replaces the server text so the user still sees why.
fn error_body(body: reqwest::Result<String>) -> String {
    body.unwrap_or_else(|e| format!("<unreadable body: {}>", e))
}

#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self { config, http })
    }

    /// Asks the server to produce the media and returns its body as a chunk
    /// stream. The body still carries the metadata header line.
    pub async fn start_download(
        &self,
        request: &DownloadRequest,
    ) -> Result<BoxStream<'static, Result<bytes::Bytes>>> {
        let endpoint = self.config.download_endpoint();
        info!(url = %request.url, mode = %request.mode, %endpoint, "requesting download");

        let response = self
            .http
            .post(&endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&DownloadRequestBody {
                url: request.url.as_str(),
                kind: request.mode,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response.text().await);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if response.content_length() == Some(0) {
            return Err(ApiError::EmptyBody);
        }

        debug!(%status, content_length = ?response.content_length(), "download stream opened");
        Ok(response
            .bytes_stream()
            .map_err(ApiError::RequestError)
            .boxed())
    }
}
