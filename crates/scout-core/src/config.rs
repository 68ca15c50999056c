use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const RATE_WINDOW_SECS: u64 = 60; // rolling rate-limit window
pub const RATE_MAX_REQUESTS: usize = 5; // requests per identity per window

/// Top-level config (scout.toml + SCOUT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoutConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub docs: DocsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the model service. Empty means unconfigured; every turn
    /// is then answered with a terminal error event.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: String::new(),
            base_url: default_base_url(),
            embed_model: default_embed_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_rate_window")]
    pub window_secs: u64,
    #[serde(default = "default_rate_max")]
    pub max_requests: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            window_secs: RATE_WINDOW_SECS,
            max_requests: RATE_MAX_REQUESTS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_embed_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_rate_window() -> u64 {
    RATE_WINDOW_SECS
}
fn default_rate_max() -> usize {
    RATE_MAX_REQUESTS
}
fn default_upload_dir() -> String {
    "./uploads".to_string()
}

impl ScoutConfig {
    /// Load config from a TOML file with SCOUT_* env var overrides.
    ///
    /// Nested keys use double underscores in the environment, e.g.
    /// `SCOUT_LLM__API_KEY` maps to `llm.api_key`. A missing file is not an
    /// error; every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ScoutConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SCOUT_").split("__"))
            .extract()
            .map_err(|e| crate::error::ScoutError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    "scout.toml".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_file() {
        let config = ScoutConfig::load(Some("/nonexistent/scout.toml")).expect("load failed");
        assert_eq!(config.gateway.port, DEFAULT_PORT);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.base_url, "https://api.openai.com");
        assert!(config.llm.api_key.is_empty());
        assert_eq!(config.limits.max_requests, 5);
        assert_eq!(config.limits.window_secs, 60);
    }

    #[test]
    fn default_struct_matches_loaded_defaults() {
        let loaded = ScoutConfig::load(Some("/nonexistent/scout.toml")).expect("load failed");
        let built = ScoutConfig::default();
        assert_eq!(loaded.llm.embed_model, built.llm.embed_model);
        assert_eq!(loaded.docs.upload_dir, built.docs.upload_dir);
    }
}
