// Upload command pipeline
//
// input file -> records -> policy (resolved endpoint) -> session -> report

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use batchsync_config::RuntimeConfig;
use batchsync_core::{batch_count, parse_records, InputFormat, Record};
use batchsync_uploader::{resolve_base_url, UploadPolicy, UploadReport, Uploader};
use tracing::{error, info};

/// Where a collection goes: a configured destination or an ad-hoc path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Destination(String),
    Path(String),
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub target: Target,
    pub input: PathBuf,
    /// Detected from the input extension when `None`
    pub format: Option<InputFormat>,
    /// Skips endpoint resolution when set
    pub base_url: Option<String>,
    pub batch_size: Option<usize>,
    pub dry_run: bool,
}

/// Read and parse a record file. Unknown extensions are read as a JSON array.
pub fn load_records(path: &Path, format: Option<InputFormat>) -> Result<Vec<Record>> {
    let format = format
        .or_else(|| InputFormat::from_path(path))
        .unwrap_or(InputFormat::Json);
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    parse_records(&bytes, format)
        .with_context(|| format!("Failed to parse records from {}", path.display()))
}

/// Build the session policy for a request against a known base URL.
pub fn build_policy(
    config: &RuntimeConfig,
    request: &UploadRequest,
    base_url: &str,
) -> Result<UploadPolicy> {
    let policy = match &request.target {
        Target::Destination(name) => UploadPolicy::for_destination(config, base_url, name)?,
        Target::Path(path) => UploadPolicy::for_path(config, base_url, path)?,
    };
    match request.batch_size {
        Some(size) => Ok(policy.with_batch_size(size)?),
        None => Ok(policy),
    }
}

/// Base URL for a request: explicit flag, else resolved from `[endpoint]`.
pub async fn request_base_url(config: &RuntimeConfig, request: &UploadRequest) -> Result<String> {
    if let Some(url) = &request.base_url {
        return Ok(url.clone());
    }
    if request.dry_run {
        // no probing on a dry run
        return config
            .endpoint
            .base_url
            .as_ref()
            .or(config.endpoint.local_url.as_ref())
            .or(config.endpoint.remote_url.as_ref())
            .cloned()
            .context("No endpoint configured; pass --base-url or set [endpoint]");
    }
    let resolved = resolve_base_url(&config.endpoint).await?;
    info!(url = %resolved.url, source = %resolved.source, "Resolved base URL");
    Ok(resolved.url)
}

/// Run one upload. Returns `None` for a dry run.
pub async fn run_upload(
    config: &RuntimeConfig,
    request: &UploadRequest,
) -> Result<Option<UploadReport>> {
    let records = load_records(&request.input, request.format)?;
    let base_url = request_base_url(config, request).await?;
    let policy = build_policy(config, request, &base_url)?;

    if request.dry_run {
        log_plan(&policy, records.len());
        return Ok(None);
    }

    let uploader = Uploader::new(policy)?;
    let report = uploader.upload(records).await;
    log_summary(&report);
    Ok(Some(report))
}

fn log_plan(policy: &UploadPolicy, records: usize) {
    let batches = batch_count(records, policy.batch_size);
    info!("Dry run, nothing will be sent");
    info!("  Endpoint: {}", policy.endpoint);
    info!("  Records: {}", records);
    info!("  Batches: {} x {}", batches, policy.batch_size);
    if batches > 0 {
        info!("  First request: POST {}", policy.batch_url(true));
    }
}

fn log_summary(report: &UploadReport) {
    if report.succeeded() {
        info!(
            records = report.total_records,
            batches = report.total_batches,
            requests = report.requests_sent(),
            "Upload succeeded"
        );
        return;
    }

    if let Some(failed) = report.failure() {
        error!(
            endpoint = %report.endpoint,
            batch = failed.index + 1,
            of = report.total_batches,
            attempts = failed.outcome.attempts(),
            reason = failed.outcome.reason().unwrap_or_default(),
            accepted_records = report.accepted_records(),
            "Upload failed"
        );
    }
}
