//! Delivery of a single batch.
//!
//! A transport issues exactly one request per call and reports what happened.
//! It never retries and never interprets the status code; that is the job of
//! [`crate::classify`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use batchsync_core::Batch;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use thiserror::Error;
use tracing::debug;

use crate::error::{Result, UploadError};

/// Raw response of the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub status: u16,
    pub body: String,
}

impl Delivery {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connect or response timeout elapsed
    Timeout,
    /// Connection refused/reset, DNS failure
    Connect,
    /// Connection dropped mid-request
    Network,
    /// The request could not be built (body encoding, malformed URL)
    Invalid,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Connect => write!(f, "connect"),
            FailureKind::Network => write!(f, "network"),
            FailureKind::Invalid => write!(f, "invalid request"),
        }
    }
}

/// A request that produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} failure: {message}")]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_connect() {
            FailureKind::Connect
        } else if err.is_builder() {
            FailureKind::Invalid
        } else {
            FailureKind::Network
        };
        Self::new(kind, err.to_string())
    }
}

pub type DeliveryResult = std::result::Result<Delivery, TransportFailure>;

/// Sends one batch to one URL.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    /// `url` already carries the batch's `reset` query parameter.
    async fn deliver(&self, url: &Url, batch: &Batch) -> DeliveryResult;
}

/// JSON-over-HTTP transport on reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(connect_timeout: Duration, response_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(response_timeout)
            .build()
            .map_err(UploadError::client_build)?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BatchTransport for HttpTransport {
    async fn deliver(&self, url: &Url, batch: &Batch) -> DeliveryResult {
        let body = batch
            .body()
            .map_err(|e| TransportFailure::new(FailureKind::Invalid, e.to_string()))?;

        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        // The status is authoritative; a body that cannot be read only loses the busy-marker fallback.
        let body = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                debug!(status, error = %e, "Failed to read response body");
                String::new()
            }
        };

        Ok(Delivery { status, body })
    }
}
