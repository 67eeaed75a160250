// Configuration validation
//
// Validates that required fields are present and values are sensible

use super::*;
use anyhow::{bail, Result};

// Destinations reject oversized bodies with 413
const LARGE_BATCH: usize = 5_000;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_endpoint_config(&config.endpoint)?;
    validate_batch_size("batch.size", config.batch.size)?;
    validate_retry_config(&config.retry)?;
    validate_request_config(&config.request)?;

    for (name, destination) in &config.destinations {
        validate_destination(name, destination)?;
    }

    Ok(())
}

/// Settings that are valid but probably not intended.
pub fn config_warnings(config: &RuntimeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let sizes = std::iter::once(("batch.size".to_string(), Some(config.batch.size))).chain(
        config
            .destinations
            .iter()
            .map(|(name, d)| (format!("destinations.{}.batch_size", name), d.batch_size)),
    );
    for (field, size) in sizes {
        if let Some(size) = size.filter(|s| *s > LARGE_BATCH) {
            warnings.push(format!(
                "{} is {}; the destination may answer 413",
                field, size
            ));
        }
    }

    if config.retry.base_wait_secs == 0 {
        warnings.push(
            "retry.base_wait_secs is 0; transient failures will be retried immediately"
                .to_string(),
        );
    }

    warnings
}

fn validate_endpoint_config(config: &EndpointConfig) -> Result<()> {
    let urls = [
        ("endpoint.base_url", &config.base_url),
        ("endpoint.local_url", &config.local_url),
        ("endpoint.remote_url", &config.remote_url),
    ];

    if urls.iter().all(|(_, url)| url.is_none()) {
        bail!(
            "No destination URL configured\n\n\
            How to fix:\n\
              • Environment: export {}BASE_URL=http://localhost:3000\n\
              • TOML: [endpoint]\n              base_url = \"http://localhost:3000\"\n",
            ENV_PREFIX
        );
    }

    for (field, url) in urls {
        if let Some(url) = url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("{} must start with http:// or https:// (got '{}')", field, url);
            }
        }
    }

    if config.local_url.is_some() && config.probe_timeout_ms == 0 {
        bail!("endpoint.probe_timeout_ms must be greater than 0");
    }

    Ok(())
}

fn validate_batch_size(field: &str, size: usize) -> Result<()> {
    if size == 0 {
        bail!("{} must be greater than 0", field);
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<()> {
    if config.max_attempts == 0 {
        bail!("retry.max_attempts must be greater than 0");
    }

    for status in &config.transient_statuses {
        if !(100..=599).contains(status) {
            bail!("retry.transient_statuses contains invalid HTTP status {}", status);
        }
        if (200..=299).contains(status) {
            bail!(
                "retry.transient_statuses must not contain success status {}",
                status
            );
        }
    }

    if config.busy_markers.iter().any(|m| m.is_empty()) {
        bail!("retry.busy_markers must not contain empty strings");
    }

    Ok(())
}

fn validate_request_config(config: &RequestConfig) -> Result<()> {
    if config.connect_timeout_secs == 0 {
        bail!("request.connect_timeout_secs must be greater than 0");
    }

    if config.response_timeout_secs == 0 {
        bail!("request.response_timeout_secs must be greater than 0");
    }

    Ok(())
}

fn validate_destination(name: &str, config: &DestinationConfig) -> Result<()> {
    if !config.path.starts_with('/') {
        bail!(
            "destinations.{}.path must start with '/' (got '{}')",
            name,
            config.path
        );
    }

    if let Some(size) = config.batch_size {
        validate_batch_size(&format!("destinations.{}.batch_size", name), size)?;
    }

    if let Some((field, _)) = config.field_defaults.iter().find(|(_, v)| v.is_null()) {
        bail!(
            "destinations.{}.field_defaults.{} must not be null",
            name,
            field
        );
    }

    Ok(())
}
