use serde::{ Deserialize, Serialize };
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::cli::Args;

pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Cloudflare account id is required (set CLOUDFLARE_ACCOUNT_ID or --account-id)")]
    MissingAccountId,
    #[error("Cloudflare API token is required (set CLOUDFLARE_API_TOKEN or --api-token)")]
    MissingApiToken,
    #[error("Invalid base URL '{0}': expected http:// or https://")]
    InvalidBaseUrl(String),
    #[error("Unsupported history store type: {0}")]
    UnsupportedHistoryType(String),
    #[error("Invalid API token format: {0}")]
    InvalidToken(String),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryType {
    File,
    Redis,
    Memory,
}

impl FromStr for HistoryType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(HistoryType::File),
            "redis" => Ok(HistoryType::Redis),
            "memory" => Ok(HistoryType::Memory),
            _ => Err(ConfigError::UnsupportedHistoryType(s.to_string())),
        }
    }
}

impl fmt::Display for HistoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HistoryType::File => "file",
            HistoryType::Redis => "redis",
            HistoryType::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

/// Everything the client needs, resolved once at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub account_id: String,
    pub api_token: String,
    pub default_model: Option<String>,
    pub base_url: String,
    pub request_timeout: Option<Duration>,
    pub max_history_chats: usize,
    pub history_type: HistoryType,
    pub data_dir: PathBuf,
    pub history_host: String,
    pub history_redis_prefix: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("account_id", &self.account_id)
            .field("api_token", &"<redacted>")
            .field("default_model", &self.default_model)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_history_chats", &self.max_history_chats)
            .field("history_type", &self.history_type)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl AppConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let account_id = args.account_id.trim().to_string();
        if account_id.is_empty() {
            return Err(ConfigError::MissingAccountId);
        }
        let api_token = args.api_token.trim().to_string();
        if api_token.is_empty() {
            return Err(ConfigError::MissingApiToken);
        }

        let base_url = args.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(args.base_url.clone()));
        }

        let default_model = args.default_model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Ok(Self {
            account_id,
            api_token,
            default_model,
            base_url,
            request_timeout: (args.request_timeout > 0).then(|| Duration::from_secs(args.request_timeout)),
            max_history_chats: args.max_history_chats,
            history_type: args.history_type.parse()?,
            data_dir: args.data_dir.clone().unwrap_or_else(default_data_dir),
            history_host: args.history_host.clone(),
            history_redis_prefix: args.history_redis_prefix.clone(),
        })
    }

    pub fn models_url(&self) -> String {
        format!("{}/accounts/{}/ai/models/search", self.base_url, self.account_id)
    }

    pub fn run_url(&self, model: &str) -> String {
        format!("{}/accounts/{}/ai/run/{}", self.base_url, self.account_id, model)
    }
}

pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "cloudflare", "workers-ai-query")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".workers-ai-query"))
}
