//! Runtime configuration, read from the environment once at startup.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DB_PATH: &str = "./data/service-chat.db";
const DEFAULT_CATEGORY_IDS_PATH: &str = "./data/id.json";
const DEFAULT_CATEGORY_TREES_PATH: &str = "./data/data.json";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// OpenAI API key.
    pub openai_api_key: SecretString,
    /// Chat model name.
    pub model: String,
    /// Hard timeout on each LLM call; expiry is treated as a transient
    /// failure and triggers the fallback reply path.
    pub llm_timeout: Duration,
    /// Path of the local lead database.
    pub db_path: PathBuf,
    /// Path of the category id → name document.
    pub category_ids_path: PathBuf,
    /// Path of the category name → decision tree document.
    pub category_trees_path: PathBuf,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let port = parse_env("SERVICE_CHAT_PORT", DEFAULT_PORT)?;
        let timeout_secs = parse_env("SERVICE_CHAT_LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)?;

        let model =
            std::env::var("SERVICE_CHAT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self {
            port,
            openai_api_key,
            model,
            llm_timeout: Duration::from_secs(timeout_secs),
            db_path: path_env("SERVICE_CHAT_DB_PATH", DEFAULT_DB_PATH),
            category_ids_path: path_env("SERVICE_CHAT_CATEGORY_IDS", DEFAULT_CATEGORY_IDS_PATH),
            category_trees_path: path_env(
                "SERVICE_CHAT_CATEGORY_TREES",
                DEFAULT_CATEGORY_TREES_PATH,
            ),
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("could not parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

fn path_env(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}
