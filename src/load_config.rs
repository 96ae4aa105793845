use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::rules::RuleVersion;

/// Overrides `generation.save_interval` when set.
pub const SAVE_INTERVAL_ENV: &str = "SCRIPT_SPEECH_SAVE_INTERVAL";

/// Load a YAML config file, apply environment overrides and validate the result.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "[CONFIG] Loading configuration from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "[CONFIG] Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let config: AppConfig = match serde_yaml::from_str::<Option<AppConfig>>(&content) {
        Ok(conf) => conf.unwrap_or_default(),
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "[CONFIG] Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    finalize(config)
}

/// Apply environment overrides and validate. Used for both file-based and default configs.
pub fn finalize(mut config: AppConfig) -> Result<AppConfig> {
    if let Ok(raw) = std::env::var(SAVE_INTERVAL_ENV) {
        let interval: usize = raw
            .trim()
            .parse()
            .with_context(|| format!("{SAVE_INTERVAL_ENV} must be a positive integer, got {raw:?}"))?;
        info!(save_interval = interval, "[CONFIG] Save interval overridden from environment");
        config.generation.save_interval = interval;
    }

    if config.generation.save_interval == 0 {
        error!("[CONFIG] generation.save_interval must be at least 1");
        anyhow::bail!("generation.save_interval must be at least 1");
    }

    RuleVersion::parse(&config.rules.version)
        .with_context(|| format!("Unsupported rules.version: {}", config.rules.version))?;

    config.trace_loaded();
    Ok(config)
}
