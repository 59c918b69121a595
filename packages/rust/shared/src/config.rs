//! Application configuration for Postforge.
//!
//! User config lives at `~/.postforge/postforge.toml`.
//! Environment variables (`LLM_URL`, `PORT`) override config file values,
//! which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PostforgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "postforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".postforge";

/// Environment variable holding the model backend endpoint.
pub const LLM_URL_ENV: &str = "LLM_URL";

/// Environment variable holding the listen port.
pub const PORT_ENV: &str = "PORT";

// ---------------------------------------------------------------------------
// Config structs (matching postforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub review: ReviewConfig,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub validation: ValidationConfig,
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat-completions endpoint. Absent until `LLM_URL` or the file sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Upper bound for a single model call.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Document text beyond this many characters is truncated before summarizing.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:3b".into()
}
fn default_temperature() -> f32 {
    0.85
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_llm_timeout() -> u64 {
    120
}
fn default_max_input_chars() -> usize {
    24_000
}

/// `[server]` section. Consumed by the transport layer only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    46371
}

/// `[review]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Score a draft must reach to pass review.
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,

    /// Regenerations allowed before the loop gives up.
    #[serde(default = "default_max_regenerations")]
    pub max_regenerations: u32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
            max_regenerations: default_max_regenerations(),
        }
    }
}

fn default_threshold() -> f64 {
    7.0
}
fn default_max_regenerations() -> u32 {
    3
}

/// `[extractor]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// CSS selectors whose text is the article content.
    #[serde(default = "default_selectors")]
    pub selectors: Vec<String>,

    #[serde(default = "default_extractor_timeout")]
    pub timeout_secs: u64,

    /// Responses larger than this are refused.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,

    /// Allow fetching loopback/private hosts (local testing only).
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            selectors: default_selectors(),
            timeout_secs: default_extractor_timeout(),
            max_body_bytes: default_max_body_bytes(),
            allow_private_hosts: false,
        }
    }
}

fn default_selectors() -> Vec<String> {
    vec![".paragraph-m".into(), ".post-heading".into()]
}
fn default_extractor_timeout() -> u64 {
    30
}
fn default_max_body_bytes() -> u64 {
    5 * 1024 * 1024
}

/// Validation strictness applied to persona output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaPolicy {
    /// Every profile field must be present with the right kind.
    Strict,
    /// Any non-empty value is accepted.
    #[default]
    Loose,
}

/// `[validation]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub persona: PersonaPolicy,
}

// ---------------------------------------------------------------------------
// Environment overrides
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Apply `LLM_URL` / `PORT` from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (tests pass a closure).
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(LLM_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.llm.endpoint = Some(url.trim().to_string());
        }

        if let Some(port) = lookup(PORT_ENV).filter(|v| !v.trim().is_empty()) {
            self.server.port = port.trim().parse().map_err(|_| {
                PostforgeError::config(format!("invalid {PORT_ENV} value '{port}'"))
            })?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, passed into the orchestrator)
// ---------------------------------------------------------------------------

/// Runtime configuration handed to the orchestrator at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model backend URL; `None` is reported per request as a config error.
    pub llm_endpoint: Option<String>,
    /// Listen port for the transport layer.
    pub port: u16,
    pub default_review_threshold: f64,
    pub max_regenerations: u32,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub llm_timeout: Duration,
    pub max_input_chars: usize,
    pub persona_policy: PersonaPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            llm_endpoint: config.llm.endpoint.clone(),
            port: config.server.port,
            default_review_threshold: config.review.default_threshold,
            max_regenerations: config.review.max_regenerations,
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            llm_timeout: Duration::from_secs(config.llm.timeout_secs),
            max_input_chars: config.llm.max_input_chars,
            persona_policy: config.validation.persona,
        }
    }
}

/// Error reported whenever a model call is attempted without `LLM_URL`.
pub fn missing_endpoint() -> PostforgeError {
    PostforgeError::config(format!("Missing {LLM_URL_ENV} environment variable"))
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.postforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PostforgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.postforge/postforge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk and apply env overrides.
/// Falls back to defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    let mut config = if path.exists() {
        load_config_from(&path)?
    } else {
        tracing::debug!(?path, "config file not found, using defaults");
        AppConfig::default()
    };

    config.apply_env()?;
    Ok(config)
}

/// Load the application config from a specific file path (no env overrides).
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PostforgeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PostforgeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PostforgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PostforgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PostforgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("llama3.2:3b"));
        assert!(toml_str.contains("46371"));
        assert!(!toml_str.contains("endpoint"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.review.max_regenerations, 3);
        assert_eq!(parsed.validation.persona, PersonaPolicy::Loose);
        assert_eq!(parsed.extractor.selectors.len(), 2);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let toml_str = r#"
[llm]
endpoint = "http://localhost:11434/v1/chat/completions"

[validation]
persona = "strict"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(
            config.llm.endpoint.as_deref(),
            Some("http://localhost:11434/v1/chat/completions")
        );
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.validation.persona, PersonaPolicy::Strict);
        assert_eq!(config.review.default_threshold, 7.0);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig::default();
        config
            .apply_env_from(|key| match key {
                "LLM_URL" => Some("http://llm.internal/v1/chat/completions".into()),
                "PORT" => Some("8080".into()),
                _ => None,
            })
            .expect("apply env");
        assert_eq!(
            config.llm.endpoint.as_deref(),
            Some("http://llm.internal/v1/chat/completions")
        );
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn invalid_port_is_config_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_from(|key| (key == "PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert_eq!(err.kind(), "config");
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn missing_endpoint_is_config_error() {
        let err = missing_endpoint();
        assert_eq!(err.kind(), "config");
        assert!(err.to_string().starts_with("Missing LLM_URL"));
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let mut app = AppConfig::default();
        app.llm.endpoint = Some("http://localhost:1234".into());
        app.review.default_threshold = 8.5;
        let pipeline = PipelineConfig::from(&app);
        assert_eq!(pipeline.llm_endpoint.as_deref(), Some("http://localhost:1234"));
        assert_eq!(pipeline.default_review_threshold, 8.5);
        assert_eq!(pipeline.llm_timeout, Duration::from_secs(120));
        assert_eq!(pipeline.port, 46371);
    }
}
