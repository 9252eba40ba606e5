//! Client for the upstream contract analysis service.
//!
//! The relay never interprets the analysis result beyond requiring a JSON
//! object; the document is handed back to the HTTP layer wholesale.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, StatusCode};
use serde_json::{Map, Value};
use tokio_util::io::ReaderStream;

use crate::config::UpstreamConfig;

/// Failure modes of one analysis round trip.
///
/// Every variant surfaces to the client as a generic 500; the split exists so
/// the server logs can tell a hung upstream from a rejection, and so the retry
/// loop can limit itself to transient failures.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream analysis timed out after {}", humantime::format_duration(*timeout))]
    Timeout { timeout: Duration },

    #[error("could not reach upstream analysis service")]
    Connect(#[source] reqwest::Error),

    #[error("upstream analysis service rejected the request with status {status}")]
    Status { status: StatusCode },

    #[error("failed to decode upstream response as JSON")]
    Decode(#[source] reqwest::Error),

    #[error("upstream response was not a JSON object")]
    NotAnObject,

    #[error("failed to read spooled upload")]
    Io(#[source] std::io::Error),

    #[error("upstream request failed")]
    Request(#[source] reqwest::Error),
}

impl UpstreamError {
    /// Transient failures are worth another attempt; rejections and decode
    /// failures are permanent for a given upload.
    pub fn is_transient(&self) -> bool {
        matches!(self, UpstreamError::Timeout { .. } | UpstreamError::Connect(_))
    }
}

/// Forwards spooled uploads to the analysis endpoint.
#[derive(Clone)]
pub struct AnalysisClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl AnalysisClient {
    pub fn new(config: UpstreamConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, config })
    }

    /// POST the spooled file to the analysis endpoint and return its JSON document.
    ///
    /// The multipart part carries `file_name` so the original upload name shows
    /// up in the analysis service's logs. Transient failures (timeout,
    /// connection refused) are retried up to `max_retries` extra times with
    /// exponential backoff. Upstream rejections (non-2xx) are never retried.
    pub async fn analyze(&self, path: &Path, file_name: &str) -> Result<Map<String, Value>, UpstreamError> {
        let mut attempt: u32 = 0;
        loop {
            match self.try_analyze(path, file_name).await {
                Ok(document) => return Ok(document),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    let backoff = self.backoff_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        backoff = %humantime::format_duration(backoff),
                        error = %err,
                        "Transient upstream failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_analyze(&self, path: &Path, file_name: &str) -> Result<Map<String, Value>, UpstreamError> {
        // Rebuild the multipart body on each attempt: the stream is consumed by send.
        let file = tokio::fs::File::open(path).await.map_err(UpstreamError::Io)?;
        let part = Part::stream(Body::wrap_stream(ReaderStream::new(file))).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.config.url.clone())
            .multipart(form)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status { status });
        }

        let document: Value = response.json().await.map_err(UpstreamError::Decode)?;
        match document {
            Value::Object(fields) => Ok(fields),
            _ => Err(UpstreamError::NotAnObject),
        }
    }

    fn classify_send_error(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout {
                timeout: self.config.timeout,
            }
        } else if err.is_connect() {
            UpstreamError::Connect(err)
        } else {
            UpstreamError::Request(err)
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = self.config.backoff_factor.saturating_pow(attempt);
        self.config.backoff.saturating_mul(factor).min(self.config.max_backoff)
    }
}
