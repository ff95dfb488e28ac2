//! Trait abstraction for the upload transport to enable testing

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tracing::debug;

use crate::error::{Result, TrackerError};

/// Transport that delivers a serialized buffer to the collector
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    /// POST `body` to `endpoint` as `application/json`.
    ///
    /// Returns the HTTP status code. Transport failures (connect, timeout)
    /// are errors; any status, including non-200, is `Ok`.
    async fn post_json(&self, endpoint: &str, body: Bytes) -> Result<u16>;
}

/// [`Uploader`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: Client,
}

impl HttpUploader {
    /// Build an uploader whose requests time out after `timeout`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed (TLS backend
    /// initialisation)
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("geo-tracker/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn post_json(&self, endpoint: &str, body: Bytes) -> Result<u16> {
        let url = validate_endpoint(endpoint)?;
        let len = body.len();

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        debug!("POST {} ({} bytes) -> {}", endpoint, len, status);
        Ok(status)
    }
}

/// Parse an upload endpoint, accepting only http and https URLs
pub fn validate_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| TrackerError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TrackerError::InvalidEndpoint(format!(
            "{}: unsupported scheme '{}'",
            endpoint, other
        ))),
    }
}
