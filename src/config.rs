use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::generation::DEFAULT_SAVE_INTERVAL;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_rule_version")]
    pub version: String,
    /// Raw screenplay spelling -> canonical character name.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            version: default_rule_version(),
            aliases: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_save_interval")]
    pub save_interval: usize,
    #[serde(default = "default_replace_existing")]
    pub replace_existing: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            save_interval: default_save_interval(),
            replace_existing: default_replace_existing(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_rule_version() -> String {
    "1.0".to_string()
}
fn default_save_interval() -> usize {
    DEFAULT_SAVE_INTERVAL
}
fn default_replace_existing() -> bool {
    true
}
fn default_output_path() -> PathBuf {
    PathBuf::from("speakable_items.jsonl")
}

impl AppConfig {
    pub fn trace_loaded(&self) {
        info!(
            rule_version = %self.rules.version,
            aliases = self.rules.aliases.len(),
            save_interval = self.generation.save_interval,
            replace_existing = self.generation.replace_existing,
            output = %self.output.path.display(),
            "[CONFIG] Loaded configuration"
        );
        debug!(?self, "[CONFIG] Configuration (full debug)");
    }
}
