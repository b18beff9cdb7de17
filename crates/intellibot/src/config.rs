//! Startup configuration from the environment.

use std::env::{self, VarError};
use std::path::PathBuf;

use intellibot_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

const API_KEY_VAR: &str = "OPENAI_API_KEY";
const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
const MODEL_VAR: &str = "OPENAI_MODEL";

/// Error type for reading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    /// A variable holds bytes that are not valid Unicode.
    #[error("{0} environment variable is not valid unicode")]
    NotUnicode(&'static str),
    /// The `.env` file exists but could not be loaded.
    #[error("failed to load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

/// Loads `.env` from the working directory or its parents, if there is one.
///
/// Variables already set in the environment win over the file.
pub fn load_dotenv() -> Result<Option<PathBuf>, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Settings for reaching the model backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    api_key: String,
    base_url: Option<String>,
    model: Option<String>,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name))
    }

    fn from_lookup(
        lookup: impl Fn(&'static str) -> Result<String, VarError>,
    ) -> Result<Self, ConfigError> {
        let var = |name: &'static str| match lookup(name) {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => Ok(Some(value.trim().to_owned())),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
        };
        Ok(Self {
            api_key: var(API_KEY_VAR)?.ok_or(ConfigError::Missing(API_KEY_VAR))?,
            base_url: var(BASE_URL_VAR)?,
            model: var(MODEL_VAR)?,
        })
    }

    /// Creates the provider configuration.
    pub fn openai_config(&self) -> OpenAIConfig {
        let mut builder = OpenAIConfigBuilder::with_api_key(&self.api_key);
        if let Some(base_url) = &self.base_url {
            builder = builder.with_base_url(base_url);
        }
        if let Some(model) = &self.model {
            builder = builder.with_model(model);
        }
        builder.build()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}
