//! Configuration types for the SPI exam server.
//!
//! This module provides the configuration structures used to control the
//! server, including the exam data directory override, HTTP bind settings,
//! session lifetime, and the translation collaborator.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExamError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "exam-server.json";

/// Default HTTP port, matching the original deployment.
const fn default_port() -> u16 {
    5050
}

/// Default session lifetime in seconds (one hour).
const fn default_session_ttl() -> u64 {
    3600
}

/// Default translation endpoint.
fn default_translate_endpoint() -> String {
    "https://api.translator.example/v1/translate".to_string()
}

/// Default environment variable holding the translation API key.
fn default_api_key_env() -> String {
    "TRANSLATOR_API_KEY".to_string()
}

/// Main configuration for the exam server.
///
/// All fields have defaults so a missing config file yields a working
/// server; a present file only needs to override what it cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Exam data directory override.
    ///
    /// Takes the same role as the `EXAM_DATA_DIR` environment variable;
    /// the environment variable wins when both are set.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Port for the HTTP server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Idle lifetime of an exam session in seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Translation collaborator settings.
    #[serde(default)]
    pub translator: TranslatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            port: default_port(),
            session_ttl_secs: default_session_ttl(),
            translator: TranslatorConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `exam-server.json` in the current directory. If found,
    /// loads and validates the configuration. If not found, returns default
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            ExamError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `exam-server.json` exists there but contains
    /// invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        Self::load_from_file(&config_path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::ConfigParseError` if the file exists but contains
    /// invalid JSON, and `ExamError::ConfigValidationError` if the values
    /// are invalid (e.g., zero port or zero session lifetime).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(ExamError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ExamError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(ExamError::config_validation(
                "port must be greater than 0",
                "Set port to a free TCP port in your exam-server.json",
            ));
        }

        if self.session_ttl_secs == 0 {
            return Err(ExamError::config_validation(
                "sessionTtlSecs must be greater than 0",
                "Set sessionTtlSecs to at least 1 second in your exam-server.json",
            ));
        }

        if let Some(ref dir) = self.data_dir {
            if dir.trim().is_empty() {
                return Err(ExamError::config_validation(
                    "dataDir must not be empty when set",
                    "Remove dataDir from exam-server.json or point it at a directory",
                ));
            }
        }

        if self.translator.endpoint.trim().is_empty() {
            return Err(ExamError::config_validation(
                "translator.endpoint must not be empty",
                "Provide a translation endpoint URL in your exam-server.json",
            ));
        }

        Ok(())
    }
}

/// Configuration for the translation collaborator.
///
/// The collaborator itself is opaque; only the endpoint and the name of
/// the environment variable carrying the API key are configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatorConfig {
    /// Endpoint URL for the hosted translation service.
    #[serde(default = "default_translate_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_translate_endpoint(),
            api_key_env: default_api_key_env(),
        }
    }
}
