// Base URL resolution
//
// Scripts run both next to a development server and against the hosted one.
// A fixed base_url wins; otherwise the local URL is probed with a short GET and
// the remote URL is used when nothing answers. Any HTTP response counts as
// "up", whatever its status.

use std::fmt;
use std::time::Duration;

use batchsync_config::EndpointConfig;
use tracing::{info, warn};

use crate::error::{Result, UploadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseSource {
    /// `endpoint.base_url` was set
    Fixed,
    /// Local server answered the probe
    Local,
    /// Local probe failed (or no local URL); using the remote URL
    Remote,
    /// Local probe failed and no remote URL is configured
    LocalUnverified,
}

impl fmt::Display for BaseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseSource::Fixed => write!(f, "fixed"),
            BaseSource::Local => write!(f, "local"),
            BaseSource::Remote => write!(f, "remote"),
            BaseSource::LocalUnverified => write!(f, "local (unverified)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBase {
    pub url: String,
    pub source: BaseSource,
}

pub async fn resolve_base_url(endpoint: &EndpointConfig) -> Result<ResolvedBase> {
    if let Some(url) = &endpoint.base_url {
        return Ok(ResolvedBase {
            url: url.clone(),
            source: BaseSource::Fixed,
        });
    }

    match (&endpoint.local_url, &endpoint.remote_url) {
        (Some(local), remote) => {
            let timeout = Duration::from_millis(endpoint.probe_timeout_ms);
            if probe(local, timeout).await? {
                info!(url = %local, "Local server found");
                return Ok(ResolvedBase {
                    url: local.clone(),
                    source: BaseSource::Local,
                });
            }

            match remote {
                Some(remote) => {
                    info!(local = %local, url = %remote, "Local server offline, using remote");
                    Ok(ResolvedBase {
                        url: remote.clone(),
                        source: BaseSource::Remote,
                    })
                }
                None => {
                    warn!(url = %local, "Local server did not answer and no remote URL is configured");
                    Ok(ResolvedBase {
                        url: local.clone(),
                        source: BaseSource::LocalUnverified,
                    })
                }
            }
        }
        (None, Some(remote)) => Ok(ResolvedBase {
            url: remote.clone(),
            source: BaseSource::Remote,
        }),
        (None, None) => Err(UploadError::invalid_policy(
            "no base_url, local_url or remote_url configured",
        )),
    }
}

async fn probe(url: &str, timeout: Duration) -> Result<bool> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(UploadError::client_build)?;
    Ok(client.get(url).send().await.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_base_url_skips_probe() {
        let endpoint = EndpointConfig {
            base_url: Some("https://sync.example.com".into()),
            // would fail to probe; must not be touched
            local_url: Some("http://127.0.0.1:1".into()),
            remote_url: None,
            probe_timeout_ms: 10,
        };
        let resolved = resolve_base_url(&endpoint).await.unwrap();
        assert_eq!(resolved.source, BaseSource::Fixed);
        assert_eq!(resolved.url, "https://sync.example.com");
    }

    #[tokio::test]
    async fn test_remote_only() {
        let endpoint = EndpointConfig {
            base_url: None,
            local_url: None,
            remote_url: Some("https://sync.example.com".into()),
            probe_timeout_ms: 10,
        };
        let resolved = resolve_base_url(&endpoint).await.unwrap();
        assert_eq!(resolved.source, BaseSource::Remote);
    }

    #[tokio::test]
    async fn test_nothing_configured() {
        let endpoint = EndpointConfig {
            base_url: None,
            local_url: None,
            remote_url: None,
            probe_timeout_ms: 10,
        };
        assert!(resolve_base_url(&endpoint).await.is_err());
    }
}
