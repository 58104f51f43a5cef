//! Configuration loading from vitals.toml.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Model backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Model backend configuration. The API key is never read from the
/// config file; it comes from the environment.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional cap on completion tokens per request.
    pub max_tokens: Option<u32>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: None,
        }
    }
}

fn default_model() -> String {
    runtime::DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    runtime::DEFAULT_BASE_URL.to_string()
}

impl Config {
    /// Load configuration from a TOML file, or defaults if it is absent.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.backend.model, runtime::DEFAULT_MODEL);
        assert_eq!(config.backend.base_url, runtime::DEFAULT_BASE_URL);
        assert!(config.backend.max_tokens.is_none());
    }

    #[test]
    fn partial_backend_section_fills_in_the_rest() {
        let config = Config::parse("[backend]\nmodel = \"gpt-4o\"\n").unwrap();
        assert_eq!(config.backend.model, "gpt-4o");
        assert_eq!(config.backend.base_url, runtime::DEFAULT_BASE_URL);
    }

    #[test]
    fn full_backend_section_parses() {
        let toml = r#"
            [backend]
            model = "gpt-4o"
            base_url = "http://localhost:8080"
            max_tokens = 2048
        "#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:8080");
        assert_eq!(config.backend.max_tokens, Some(2048));
    }

    #[test]
    fn missing_file_is_defaults() {
        let config = Config::load_or_default("/nonexistent/vitals.toml").unwrap();
        assert_eq!(config.backend.model, runtime::DEFAULT_MODEL);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        assert!(matches!(
            Config::parse("[backend"),
            Err(ConfigError::Parse(_))
        ));
    }
}
