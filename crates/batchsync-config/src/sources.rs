// Configuration source loading.
//
// Priority order:
// 1. Environment variables (BATCHSYNC_* prefix)
// 2. Config file path from BATCHSYNC_CONFIG
// 3. Inline config content from BATCHSYNC_CONFIG_CONTENT
// 4. Default config files (./batchsync.toml, ./.batchsync.toml)
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::*;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_PATHS: [&str; 2] = ["./batchsync.toml", "./.batchsync.toml"];

/// Load configuration using native environment/file access.
pub fn load_config() -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::default();

    if let Some(file_config) = load_from_file(&StdEnvSource)? {
        config.merge(file_config);
    }

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

/// Find the config file. `Ok(None)` means no source was configured and no
/// default file exists; a named file that is missing or broken is an error.
fn load_from_file<E: EnvSource>(env: &E) -> Result<Option<RuntimeConfig>> {
    if let Some(path) = env.get("CONFIG") {
        return read_config_file(Path::new(&path)).map(Some);
    }

    if let Some(content) = env.get("CONFIG_CONTENT") {
        let config: RuntimeConfig = toml::from_str(&content)
            .context("Failed to parse inline config from BATCHSYNC_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_PATHS {
        let path = Path::new(path);
        if path.exists() {
            return read_config_file(path).map(Some);
        }
    }

    Ok(None)
}

fn read_config_file(path: &Path) -> Result<RuntimeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let file_config = read_config_file(path.as_ref())?;

    let mut config = RuntimeConfig::default();
    config.merge(file_config);

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;

    config.validate()?;
    Ok(config)
}

/// Load configuration, using built-in defaults when no config file is
/// configured or present. A configured file that fails to load is an error.
pub fn load_or_default() -> Result<RuntimeConfig> {
    load_or_default_from(&StdEnvSource)
}

fn load_or_default_from<E: EnvSource>(env: &E) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::default();

    // Defaults only when no file is configured or present
    if let Some(file_config) = load_from_file(env)? {
        config.merge(file_config);
    }

    env_overrides::apply_env_overrides(&mut config, env)?;

    config.validate()?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}
