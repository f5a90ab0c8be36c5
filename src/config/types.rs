//! Configuration types for route-control
//!
//! This module defines all configuration structures used by the controller.
//! Configuration is loaded from JSON files and can be validated at startup.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tokens::TokenDictionary;

/// Known renderer names accepted in `renderers`
pub const KNOWN_RENDERERS: &[&str] = &["proxy-list"];

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Token dictionary: bare token name to regex fragment
    /// (e.g. `"make": "audi|bmw|vw"` resolves the `[make]` segment)
    #[serde(default)]
    pub tokens: BTreeMap<String, String>,

    /// Path of the population snapshot file
    pub population_file: PathBuf,

    /// Directory for rendered configuration and digest files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Enabled renderers
    #[serde(default = "default_renderers")]
    pub renderers: Vec<String>,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails:
    /// - empty population file path
    /// - no renderers, or an unknown renderer name
    /// - a token fragment that does not compile as a regex
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_file.as_os_str().is_empty() {
            return Err(ConfigError::validation(
                "population_file must not be empty",
            ));
        }

        if self.renderers.is_empty() {
            return Err(ConfigError::validation(
                "At least one renderer must be configured",
            ));
        }
        for renderer in &self.renderers {
            if !KNOWN_RENDERERS.contains(&renderer.as_str()) {
                return Err(ConfigError::validation(format!(
                    "Unknown renderer '{renderer}' (known: {KNOWN_RENDERERS:?})"
                )));
            }
        }

        // Token fragments must compile; build_tokens reports the offender
        self.build_tokens()?;

        Ok(())
    }

    /// Compile the token dictionary from the configured fragments
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidTokenPattern` for a non-compiling
    /// fragment.
    pub fn build_tokens(&self) -> Result<TokenDictionary, ConfigError> {
        TokenDictionary::from_entries(self.tokens.iter())
    }

    /// Create a minimal default configuration
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            tokens: BTreeMap::new(),
            population_file: PathBuf::from("/etc/route-control/population.json"),
            output_dir: default_output_dir(),
            renderers: default_renderers(),
            log: LogConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format ("text" or "json")
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Include the event target in log lines
    #[serde(default = "default_true")]
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_true(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/var/lib/route-control")
}

fn default_renderers() -> Vec<String> {
    vec!["proxy-list".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.renderers, vec!["proxy-list"]);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_empty_population_file_rejected() {
        let mut config = Config::default_config();
        config.population_file = PathBuf::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unknown_renderer_rejected() {
        let mut config = Config::default_config();
        config.renderers = vec!["apache".to_string()];
        assert!(config.validate().is_err());

        config.renderers = Vec::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_token_fragment_rejected() {
        let mut config = Config::default_config();
        config.tokens.insert("make".into(), "[unclosed".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTokenPattern { .. })
        ));
    }

    #[test]
    fn test_build_tokens() {
        let mut config = Config::default_config();
        config.tokens.insert("make".into(), "audi|bmw".into());
        let dict = config.build_tokens().unwrap();
        assert_eq!(dict.len(), 1);
        assert!(dict.names().any(|name| name == "[make]"));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let json = r#"{
            "tokens": { "make": "audi|bmw|vw" },
            "population_file": "/tmp/population.json",
            "log": { "level": "debug" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "text");
        assert_eq!(config.renderers, vec!["proxy-list"]);
        assert_eq!(config.output_dir, PathBuf::from("/var/lib/route-control"));
        assert!(config.validate().is_ok());
    }
}
