//! Process-wide configuration, read once at each binary's entry point.
//!
//! Every other component accepts structured config rather than reading
//! the environment itself, so components stay deterministic under test
//! and multiple instances can coexist in one process.

use crate::error::CoreError;

/// Required and optional environment values for the search core.
#[derive(Debug, Clone)]
pub struct Config {
    pub turso_url: String,
    pub turso_auth_token: String,
    pub openai_api_key: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
}

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Required keys are checked in order `TURSO_URL`, `TURSO_AUTH_TOKEN`,
    /// `OPENAI_API_KEY`; the first missing one names the error. Optional
    /// keys fall back to their documented defaults.
    pub fn from_env() -> Result<Self, CoreError> {
        let turso_url = require_env("TURSO_URL")?;
        let turso_auth_token = require_env("TURSO_AUTH_TOKEN")?;
        let openai_api_key = require_env("OPENAI_API_KEY")?;

        let embedding_model = std::env::var("EMBEDDING_MODEL")
            .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());

        let embedding_dimensions = match std::env::var("EMBEDDING_DIMENSIONS") {
            Ok(raw) => raw.trim().parse::<usize>().map_err(|_| {
                CoreError::ConfigError(format!(
                    "EMBEDDING_DIMENSIONS must be a positive integer, got {raw:?}"
                ))
            })?,
            Err(_) => DEFAULT_EMBEDDING_DIMENSIONS,
        };

        Ok(Config {
            turso_url,
            turso_auth_token,
            openai_api_key,
            embedding_model,
            embedding_dimensions,
        })
    }
}

fn require_env(key: &str) -> Result<String, CoreError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CoreError::ConfigError(format!("missing required environment variable {key}")))
}
