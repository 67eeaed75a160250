// batchsync-config - Unified configuration for the uploader and CLI
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from BATCHSYNC_CONFIG env var
// 3. Config file contents from BATCHSYNC_CONFIG_CONTENT env var
// 4. Default config file locations (./batchsync.toml, ./.batchsync.toml)
// 5. Built-in defaults (lowest priority)

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};

/// Main runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub request: RequestConfig,

    #[serde(default)]
    pub log: LogConfig,

    /// Per-destination tuning, keyed by a short dataset name (e.g. "vendas").
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub destinations: BTreeMap<String, DestinationConfig>,
}

/// Where the destination service lives.
///
/// A fixed `base_url` wins. Otherwise `local_url` is probed and `remote_url`
/// is the fallback when nothing answers locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    pub probe_timeout_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            local_url: Some("http://localhost:3000".to_string()),
            remote_url: None,
            probe_timeout_ms: 1_000,
        }
    }
}

/// Batch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum records per request
    pub size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { size: 250 }
    }
}

/// Retry and pacing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per batch, including the first one
    pub max_attempts: u32,
    /// Backoff before attempt n+1 is `base_wait_secs * n`
    pub base_wait_secs: u64,
    /// Pause between two accepted batches
    pub pacing_ms: u64,
    pub transient_statuses: Vec<u16>,
    /// Response-body substrings meaning "destination storage is busy"
    pub busy_markers: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_wait_secs: 8,
            pacing_ms: 1_500,
            transient_statuses: vec![502, 503, 504],
            busy_markers: vec!["SQLITE_BUSY".to_string()],
        }
    }
}

/// Per-request timeouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub connect_timeout_secs: u64,
    pub response_timeout_secs: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            response_timeout_secs: 180,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

/// A named dataset endpoint with its own tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Path appended to the base URL, e.g. "/api/sync/vendas"
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_wait_secs: Option<u64>,
    /// Values substituted for `null` fields before upload
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_defaults: BTreeMap<String, serde_json::Value>,
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from a specific file path (for CLI usage).
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Load configuration, falling back to built-in defaults only when no
    /// config file is configured or present.
    pub fn load_or_default() -> Result<Self> {
        sources::load_or_default()
    }

    /// Parse a TOML document. Missing sections fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config content")
    }

    /// Merge another config into this one (used for TOML layering).
    pub fn merge(&mut self, other: RuntimeConfig) {
        self.endpoint = other.endpoint;
        self.batch = other.batch;
        self.retry = other.retry;
        self.request = other.request;
        self.log = other.log;

        if !other.destinations.is_empty() {
            self.destinations = other.destinations;
        }
    }

    /// Apply environment overrides from a custom source.
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Look up a named destination.
    pub fn destination(&self, name: &str) -> Result<&DestinationConfig> {
        self.destinations.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.destinations.keys().map(String::as_str).collect();
            anyhow::anyhow!(
                "Unknown destination '{}'. Configured destinations: [{}]",
                name,
                known.join(", ")
            )
        })
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render config as TOML")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Settings that pass validation but look like mistakes.
    pub fn warnings(&self) -> Vec<String> {
        validation::config_warnings(self)
    }

    /// Log [`RuntimeConfig::warnings`]. Call once a subscriber is installed.
    pub fn log_warnings(&self) {
        for warning in self.warnings() {
            tracing::warn!("{}", warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("TEXT".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_default_configs() {
        let config = RuntimeConfig::default();
        assert_eq!(config.batch.size, 250);
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.retry.base_wait_secs, 8);
        assert_eq!(config.retry.transient_statuses, vec![502, 503, 504]);
        assert_eq!(config.request.connect_timeout_secs, 10);
        assert_eq!(config.request.response_timeout_secs, 180);
        assert_eq!(config.log.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [retry]
            base_wait_secs = 15

            [destinations.vendas]
            path = "/api/sync/vendas"
            batch_size = 500

            [destinations.estoque]
            path = "/api/sync/estoque"
            field_defaults = { QUANTIDADE = 0, DESCRICAO = "" }
            "#,
        )
        .unwrap();

        assert_eq!(config.retry.base_wait_secs, 15);
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.batch.size, 250);

        let vendas = config.destination("vendas").unwrap();
        assert_eq!(vendas.batch_size, Some(500));
        assert_eq!(vendas.base_wait_secs, None);

        let estoque = config.destination("estoque").unwrap();
        assert_eq!(estoque.field_defaults["QUANTIDADE"], serde_json::json!(0));
        assert_eq!(estoque.field_defaults["DESCRICAO"], serde_json::json!(""));
    }

    #[test]
    fn test_unknown_destination_lists_known_names() {
        let config =
            RuntimeConfig::from_toml_str("[destinations.vendas]\npath = \"/api/sync/vendas\"\n")
                .unwrap();
        let err = config.destination("precos").unwrap_err().to_string();
        assert!(err.contains("precos"));
        assert!(err.contains("vendas"));
    }

    #[test]
    fn test_toml_rendering_parses_back() {
        let config = RuntimeConfig::from_toml_str(
            "[endpoint]\nbase_url = \"http://sync.internal\"\n[destinations.vendas]\npath = \"/api/sync/vendas\"\n",
        )
        .unwrap();
        let rendered = config.to_toml_string().unwrap();
        let reparsed = RuntimeConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }
}
