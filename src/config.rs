// Runtime configuration.
//
// Every path, scope and endpoint the assistant needs lives in `AppConfig`.
// `main` builds it once from the environment (after `.env` is loaded) and
// hands it to the credential store, the Google clients and the summarizer.

use crate::core::summary::DEFAULT_MAX_WORDS;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

const CONFIG_DIR_NAME: &str = "mcp-gdrive";
const TOKEN_FILE_NAME: &str = "token.json";
const CLIENT_SECRET_FILE_NAME: &str = "gcp-oauth.keys.json";

const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com";
const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";
const DEFAULT_OLLAMA_MODEL: &str = "gemma:2b";
const DEFAULT_OLLAMA_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine a configuration directory. Set DRIVE_SUMMARY_CONFIG_DIR.")]
    NoConfigDir,

    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the assistant needs to talk to Google, Ollama and Discord.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Where the OAuth token (access + refresh) is persisted.
    pub token_path: PathBuf,
    /// OAuth client secret downloaded from the Google Cloud console.
    pub client_secret_path: PathBuf,
    /// Scopes requested during consent and required of a stored token.
    pub scopes: Vec<String>,
    pub drive_api_base: String,
    pub sheets_api_base: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub ollama_timeout: Duration,
    /// Extracted text is cut to this many whitespace-separated words.
    pub summary_max_words: usize,
    /// Only required by the `bot` command.
    pub discord_token: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Split out from `from_env` so tests can feed a plain map instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config_dir = match get("DRIVE_SUMMARY_CONFIG_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs_next::config_dir()
                .ok_or(ConfigError::NoConfigDir)?
                .join(CONFIG_DIR_NAME),
        };

        let token_path = get("DRIVE_SUMMARY_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join(TOKEN_FILE_NAME));
        let client_secret_path = get("DRIVE_SUMMARY_CLIENT_SECRET_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join(CLIENT_SECRET_FILE_NAME));

        let ollama_timeout_secs = match get("OLLAMA_TIMEOUT_SECS") {
            Some(raw) => parse_positive("OLLAMA_TIMEOUT_SECS", &raw)? as u64,
            None => DEFAULT_OLLAMA_TIMEOUT_SECS,
        };
        let summary_max_words = match get("SUMMARY_MAX_WORDS") {
            Some(raw) => parse_positive("SUMMARY_MAX_WORDS", &raw)?,
            None => DEFAULT_MAX_WORDS,
        };

        Ok(Self {
            token_path,
            client_secret_path,
            scopes: vec![
                DRIVE_READONLY_SCOPE.to_string(),
                SHEETS_READONLY_SCOPE.to_string(),
            ],
            drive_api_base: get("GOOGLE_DRIVE_API_BASE")
                .unwrap_or_else(|| DEFAULT_DRIVE_API_BASE.to_string()),
            sheets_api_base: get("GOOGLE_SHEETS_API_BASE")
                .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string()),
            ollama_url: get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            ollama_model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            ollama_timeout: Duration::from_secs(ollama_timeout_secs),
            summary_max_words,
            discord_token: get("DISCORD_TOKEN"),
        })
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    let value: usize = raw
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        })?;

    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(value)
}
