use super::{LogFormat, RuntimeConfig};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "BATCHSYNC_";

/// Abstraction over environment-variable lookups so tests (and embedding
/// callers) can supply their own source of overrides.
pub trait EnvSource {
    /// Look up `key` without the BATCHSYNC_ prefix.
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Endpoint
    if let Some(url) = get_env_string(env, "BASE_URL") {
        config.endpoint.base_url = non_empty(url);
    }
    if let Some(url) = get_env_string(env, "LOCAL_URL") {
        config.endpoint.local_url = non_empty(url);
    }
    if let Some(url) = get_env_string(env, "REMOTE_URL") {
        config.endpoint.remote_url = non_empty(url);
    }
    if let Some(val) = get_env_u64(env, "PROBE_TIMEOUT_MS")? {
        config.endpoint.probe_timeout_ms = val;
    }

    // Batch configuration
    if let Some(val) = get_env_usize(env, "BATCH_SIZE")? {
        config.batch.size = val;
    }

    // Retry configuration
    if let Some(val) = get_env_u32(env, "MAX_ATTEMPTS")? {
        config.retry.max_attempts = val;
    }
    if let Some(val) = get_env_u64(env, "BASE_WAIT_SECS")? {
        config.retry.base_wait_secs = val;
    }
    if let Some(val) = get_env_u64(env, "PACING_MS")? {
        config.retry.pacing_ms = val;
    }
    if let Some(list) = get_env_string(env, "TRANSIENT_STATUSES") {
        config.retry.transient_statuses = split_list(&list)
            .map(|s| {
                s.parse::<u16>()
                    .map_err(|e| anyhow!("Failed to parse {}TRANSIENT_STATUSES entry '{}': {}", ENV_PREFIX, s, e))
            })
            .collect::<Result<Vec<_>>>()?;
    }
    if let Some(list) = get_env_string(env, "BUSY_MARKERS") {
        config.retry.busy_markers = split_list(&list).map(str::to_string).collect();
    }

    // Request timeouts
    if let Some(val) = get_env_u64(env, "CONNECT_TIMEOUT_SECS")? {
        config.request.connect_timeout_secs = val;
    }
    if let Some(val) = get_env_u64(env, "RESPONSE_TIMEOUT_SECS")? {
        config.request.response_timeout_secs = val;
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.log.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.log.format = format
            .parse::<LogFormat>()
            .context("Invalid BATCHSYNC_LOG_FORMAT value")?;
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    parse_env(env, key)
}

fn get_env_u32<E: EnvSource>(env: &E, key: &str) -> Result<Option<u32>> {
    parse_env(env, key)
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    parse_env(env, key)
}

fn parse_env<E, T>(env: &E, key: &str) -> Result<Option<T>>
where
    E: EnvSource,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
