//! Service configuration.
//!
//! Values come from the process environment after `.env` has been loaded.
//! The OpenRouter key is resolved separately so that a real key in `.env`
//! beats a stale one exported in the shell.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_MAX_UPLOAD_MB: usize = 16;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";
const DEFAULT_MODEL: &str = "qwen/qwen-2-vl-72b-instruct";
const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Runtime configuration for the whole service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_origins: Vec<String>,
    pub llm: LlmSettings,
    pub tesseract_bin: String,
}

/// Settings for the vision model endpoint.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// `None` when no usable credential was found.
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_OPENROUTER_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let max_upload_mb: usize = parse_var("MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB)?;
        let timeout_secs: u64 = parse_var("LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)?;

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("receipt-extractor-uploads"));

        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let api_key = resolve_api_key(dotenv_file_value(API_KEY_VAR), std::env::var(API_KEY_VAR).ok());
        if api_key.is_none() {
            warn!("{} not set or contains placeholder value; LLM requests will fall back to OCR", API_KEY_VAR);
        }

        let config = Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            upload_dir,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            cors_origins,
            llm: LlmSettings {
                api_key,
                model: std::env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
                endpoint: std::env::var("OPENROUTER_URL")
                    .unwrap_or_else(|_| DEFAULT_OPENROUTER_URL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            tesseract_bin: std::env::var("TESSERACT_BIN").unwrap_or_else(|_| "tesseract".to_string()),
        };

        info!(
            "Config: bind={}, uploads={:?}, max_upload={}MB, model={}, llm_timeout={}s",
            config.bind_addr, config.upload_dir, max_upload_mb, config.llm.model, timeout_secs
        );

        Ok(config)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

/// Read a single key straight from the `.env` file, ignoring the shell.
fn dotenv_file_value(key: &str) -> Option<String> {
    let iter = dotenvy::dotenv_iter().ok()?;
    iter.filter_map(|item| item.ok())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}

/// Pick the API key: a usable `.env` value first, then the shell value.
pub fn resolve_api_key(file_value: Option<String>, env_value: Option<String>) -> Option<String> {
    file_value
        .map(|v| v.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|v| !is_placeholder_key(v))
        .or_else(|| {
            env_value
                .map(|v| v.trim().to_string())
                .filter(|v| !is_placeholder_key(v))
        })
}

fn is_placeholder_key(key: &str) -> bool {
    key.is_empty() || key.starts_with("your-") || key == "your_api_key_here"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_key_wins_over_env() {
        let key = resolve_api_key(Some("sk-or-file".into()), Some("sk-or-shell".into()));
        assert_eq!(key.as_deref(), Some("sk-or-file"));
    }

    #[test]
    fn test_placeholder_in_file_falls_through_to_env() {
        let key = resolve_api_key(Some("your-key-goes-here".into()), Some("sk-or-shell".into()));
        assert_eq!(key.as_deref(), Some("sk-or-shell"));
    }

    #[test]
    fn test_placeholders_everywhere_means_no_key() {
        assert!(resolve_api_key(Some("your_api_key_here".into()), Some("".into())).is_none());
        assert!(resolve_api_key(None, None).is_none());
    }

    #[test]
    fn test_quoted_file_value_is_unwrapped() {
        let key = resolve_api_key(Some("\"sk-or-quoted\"".into()), None);
        assert_eq!(key.as_deref(), Some("sk-or-quoted"));
    }
}
