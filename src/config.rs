//! Pipeline configuration helpers.
//!
//! Loads, validates, and defaults the JSON config that points the pipeline at
//! its completion and news backends. Credentials never live here; they are
//! supplied per invocation.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Environment variable holding the completion API key.
pub const API_KEY_ENV: &str = "SHADOW_TPM_API_KEY";
/// Environment variable holding the news API key.
pub const NEWS_API_KEY_ENV: &str = "SHADOW_TPM_NEWS_API_KEY";

const CONFIG_DIR_NAME: &str = "shadow-tpm";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_NEWS_QUERY: &str =
    "AI infrastructure OR data center OR TPU OR power shortage OR vendor delay OR gigawatt compute";

/// Backend endpoints, model, and timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub schema_version: u32,
    pub model: String,
    pub completion_endpoint: String,
    pub completion_timeout_secs: u64,
    pub news_endpoint: String,
    pub news_query: String,
    pub news_page_size: u32,
    pub news_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            model: "gemini-3-flash-preview".to_string(),
            completion_endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            completion_timeout_secs: 120,
            news_endpoint: "https://newsapi.org/v2/everything".to_string(),
            news_query: DEFAULT_NEWS_QUERY.to_string(),
            news_page_size: 5,
            news_timeout_secs: 10,
        }
    }
}

/// Render a pretty JSON config stub.
pub fn config_stub() -> Result<String> {
    crate::util::to_pretty_json(&PipelineConfig::default()).context("serialize config stub")
}

/// Default per-user config location, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load a config file.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: PipelineConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Resolve the effective config: explicit path, then the per-user file, then defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    let config = match explicit {
        Some(path) => load_config(path)?,
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => {
                tracing::info!(path = %path.display(), "using user config");
                load_config(&path)?
            }
            None => PipelineConfig::default(),
        },
    };
    validate_config(&config)?;
    Ok(config)
}

/// Validate schema version, endpoints, and limits.
pub fn validate_config(config: &PipelineConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    for (label, value) in [
        ("model", &config.model),
        ("completion_endpoint", &config.completion_endpoint),
        ("news_endpoint", &config.news_endpoint),
        ("news_query", &config.news_query),
    ] {
        if value.trim().is_empty() {
            return Err(anyhow!("{label} must be non-empty"));
        }
    }
    if config.completion_timeout_secs == 0 || config.news_timeout_secs == 0 {
        return Err(anyhow!("timeouts must be at least one second"));
    }
    if !(1..=100).contains(&config.news_page_size) {
        return Err(anyhow!(
            "news_page_size must be between 1 and 100 (got {})",
            config.news_page_size
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
