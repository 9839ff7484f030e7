//! Configuration management for whisperfunc.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Completion token ceiling; unset leaves it to the service.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Ceiling for one completion round-trip, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    /// Root directory the file tools may touch; the process working
    /// directory when unset.
    #[serde(default)]
    pub sandbox_root: Option<PathBuf>,
    #[serde(default = "default_product_search_base")]
    pub product_search_base: String,
}

fn default_product_search_base() -> String {
    "https://api.a-premium-test.com".to_string()
}

impl AppConfig {
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".whisperfunc").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            toml::from_str(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            Self::default()
        };

        if let Ok(model) = std::env::var("WHISPERFUNC_MODEL") {
            config.llm.model = model;
        }
        if let Ok(api_base) = std::env::var("WHISPERFUNC_API_BASE") {
            config.llm.api_base = api_base;
        }

        Ok(config)
    }

    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = &self.llm.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        std::env::var(&self.llm.api_key_env).with_context(|| {
            format!(
                "API key not found. Either:\n  \
                 1. Set api_key in config file: {}\n  \
                 2. Set environment variable: export {}=your-key",
                Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                self.llm.api_key_env
            )
        })
    }

    /// Root directory for the file tools.
    pub fn sandbox_root(&self) -> PathBuf {
        self.tools
            .sandbox_root
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn save_default() -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let default = Self::default();
        let content = toml::to_string_pretty(&default).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.server.port, 8787);
        assert!(config.llm.api_base.starts_with("https://"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [llm]
            model = "qwen-plus"
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "qwen-plus");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.server.bind, "127.0.0.1");
    }
}
