// Upload policy
//
// Everything one session needs to know about its destination: where to send,
// how to split, how to retry. Built from RuntimeConfig plus a destination, or
// directly by library callers.

use std::num::{NonZeroU32, NonZeroUsize};
use std::time::Duration;

use batchsync_config::{DestinationConfig, RetryConfig, RuntimeConfig};
use batchsync_core::FieldDefaults;
use reqwest::Url;

use crate::error::{Result, UploadError};

#[derive(Debug, Clone, PartialEq)]
pub struct UploadPolicy {
    /// Destination without the `reset` query parameter
    pub endpoint: Url,
    pub batch_size: NonZeroUsize,
    /// Total attempts per batch, including the first
    pub max_attempts: NonZeroU32,
    /// Backoff before attempt n+1 is `base_wait * n`
    pub base_wait: Duration,
    /// Pause between two accepted batches
    pub pacing: Duration,
    pub transient_statuses: Vec<u16>,
    pub busy_markers: Vec<String>,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub field_defaults: FieldDefaults,
}

impl UploadPolicy {
    /// A policy for `endpoint` using the built-in defaults.
    pub fn new(endpoint: &str) -> Result<Self> {
        let config = RuntimeConfig::default();
        Self::from_sections(parse_endpoint(endpoint)?, &config, None)
    }

    /// Policy for a named destination from the configuration.
    pub fn for_destination(config: &RuntimeConfig, base_url: &str, name: &str) -> Result<Self> {
        let destination = config
            .destination(name)
            .map_err(|e| UploadError::invalid_policy(e.to_string()))?;
        let endpoint = join_endpoint(base_url, &destination.path)?;
        Self::from_sections(endpoint, config, Some(destination))
    }

    /// Policy for an ad-hoc path using the global tuning.
    pub fn for_path(config: &RuntimeConfig, base_url: &str, path: &str) -> Result<Self> {
        let endpoint = join_endpoint(base_url, path)?;
        Self::from_sections(endpoint, config, None)
    }

    fn from_sections(
        endpoint: Url,
        config: &RuntimeConfig,
        destination: Option<&DestinationConfig>,
    ) -> Result<Self> {
        let RetryConfig {
            max_attempts,
            base_wait_secs,
            pacing_ms,
            transient_statuses,
            busy_markers,
        } = &config.retry;

        let batch_size = destination
            .and_then(|d| d.batch_size)
            .unwrap_or(config.batch.size);
        let base_wait_secs = destination
            .and_then(|d| d.base_wait_secs)
            .unwrap_or(*base_wait_secs);

        Ok(Self {
            endpoint,
            batch_size: non_zero_batch_size(batch_size)?,
            max_attempts: non_zero_attempts(*max_attempts)?,
            base_wait: Duration::from_secs(base_wait_secs),
            pacing: Duration::from_millis(*pacing_ms),
            transient_statuses: transient_statuses.clone(),
            busy_markers: busy_markers.clone(),
            connect_timeout: Duration::from_secs(config.request.connect_timeout_secs),
            response_timeout: Duration::from_secs(config.request.response_timeout_secs),
            field_defaults: destination
                .map(|d| d.field_defaults.clone())
                .unwrap_or_default(),
        })
    }

    pub fn with_batch_size(mut self, size: usize) -> Result<Self> {
        self.batch_size = non_zero_batch_size(size)?;
        Ok(self)
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Result<Self> {
        self.max_attempts = non_zero_attempts(attempts)?;
        Ok(self)
    }

    pub fn with_base_wait(mut self, base_wait: Duration) -> Self {
        self.base_wait = base_wait;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, response: Duration) -> Self {
        self.connect_timeout = connect;
        self.response_timeout = response;
        self
    }

    pub fn with_transient_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.transient_statuses = statuses;
        self
    }

    pub fn with_busy_markers(mut self, markers: Vec<String>) -> Self {
        self.busy_markers = markers;
        self
    }

    pub fn with_field_defaults(mut self, defaults: FieldDefaults) -> Self {
        self.field_defaults = defaults;
        self
    }

    /// The URL one batch is posted to.
    pub fn batch_url(&self, reset: bool) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("reset", if reset { "true" } else { "false" });
        url
    }
}

fn non_zero_batch_size(size: usize) -> Result<NonZeroUsize> {
    NonZeroUsize::new(size)
        .ok_or_else(|| UploadError::invalid_policy("batch size must be greater than 0"))
}

fn non_zero_attempts(attempts: u32) -> Result<NonZeroU32> {
    NonZeroU32::new(attempts)
        .ok_or_else(|| UploadError::invalid_policy("max attempts must be greater than 0"))
}

fn parse_endpoint(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| UploadError::invalid_endpoint(url, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(UploadError::invalid_endpoint(
            url,
            format!("unsupported scheme '{}'", other),
        )),
    }
}

/// Concatenate base URL and destination path, keeping any path prefix of the base.
pub fn join_endpoint(base_url: &str, path: &str) -> Result<Url> {
    let base = base_url.trim_end_matches('/');
    let joined = if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    };
    parse_endpoint(&joined)
}
