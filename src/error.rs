//! Error types for the service chat server.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Category catalog errors.
///
/// Any lookup failure — unknown id, or an id whose name maps to no tree —
/// surfaces as `CategoryNotFound` at the request boundary.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Category {0} not found")]
    CategoryNotFound(String),

    #[error("Failed to load catalog document {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Malformed catalog document {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// LLM provider errors. All of these are recovered locally by the
/// orchestrator's fallback path and never surfaced raw to the end user.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} returned no usable content")]
    EmptyResponse { provider: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lead store errors. Logged and surfaced as a generic retryable reply;
/// conversation state is left unchanged so the user can retry the turn.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Write failed: {0}")]
    Write(String),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
