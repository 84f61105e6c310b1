//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.line-relay/config.json`) and environment.
//! Secrets (LINE channel token/secret, completion API key) are usually supplied via env and
//! resolved once at startup into a [`RelayConfig`] that is passed to the gateway.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_LINE_ACCESS_TOKEN: &str = "LINE_ACCESS_TOKEN";
pub const ENV_LINE_CHANNEL_SECRET: &str = "LINE_CHANNEL_SECRET";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";

/// Top-level application config (file form; secrets may be absent and come from env).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// LINE Messaging API settings.
    #[serde(default)]
    pub line: LineConfig,

    /// Completion API settings.
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// Server bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for the webhook endpoint (default 10000).
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0", all interfaces).
    #[serde(default = "default_server_bind")]
    pub bind: String,
}

fn default_server_port() -> u16 {
    10000
}

fn default_server_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind: default_server_bind(),
        }
    }
}

/// LINE channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineConfig {
    /// Channel access token. Overridden by LINE_ACCESS_TOKEN env when set.
    pub channel_access_token: Option<String>,
    /// Channel secret used to verify X-Line-Signature. Overridden by LINE_CHANNEL_SECRET env when set.
    pub channel_secret: Option<String>,
    /// Messaging API base URL (default https://api.line.me). Mostly useful for tests.
    pub api_base: Option<String>,
}

/// Completion API config (OpenAI chat completions or a compatible server).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
    /// API key. Overridden by OPENAI_API_KEY env when set.
    pub api_key: Option<String>,
    /// Model id sent with every request (default "gpt-4").
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL including the version segment (default https://api.openai.com/v1).
    pub base_url: Option<String>,
    /// Timeout applied to each outbound call, completion and reply alike.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing {name} (set the {env} environment variable or {field} in the config file)")]
    Missing {
        name: &'static str,
        env: &'static str,
        field: &'static str,
    },
    #[error("completion model must not be empty")]
    EmptyModel,
}

/// Fully resolved settings, built once at startup and handed to the gateway.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: String,
    pub port: u16,
    pub channel_access_token: String,
    pub channel_secret: String,
    pub line_api_base: Option<String>,
    pub api_key: String,
    pub model: String,
    pub completion_base_url: Option<String>,
    pub timeout: Duration,
}

impl RelayConfig {
    /// Resolve from config plus process environment.
    pub fn resolve(config: &Config) -> Result<Self, ConfigError> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` for environment values. Env wins over the file; blank values count as unset.
    pub fn resolve_with<F>(config: &Config, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let channel_access_token = pick(
            &lookup,
            ENV_LINE_ACCESS_TOKEN,
            config.line.channel_access_token.as_deref(),
        )
        .ok_or(ConfigError::Missing {
            name: "LINE channel access token",
            env: ENV_LINE_ACCESS_TOKEN,
            field: "line.channelAccessToken",
        })?;
        let channel_secret = pick(
            &lookup,
            ENV_LINE_CHANNEL_SECRET,
            config.line.channel_secret.as_deref(),
        )
        .ok_or(ConfigError::Missing {
            name: "LINE channel secret",
            env: ENV_LINE_CHANNEL_SECRET,
            field: "line.channelSecret",
        })?;
        let api_key = pick(&lookup, ENV_OPENAI_API_KEY, config.completion.api_key.as_deref())
            .ok_or(ConfigError::Missing {
                name: "completion API key",
                env: ENV_OPENAI_API_KEY,
                field: "completion.apiKey",
            })?;
        let model = config.completion.model.trim();
        if model.is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        Ok(Self {
            bind: config.server.bind.trim().to_string(),
            port: config.server.port,
            channel_access_token,
            channel_secret,
            line_api_base: non_empty(config.line.api_base.as_deref()),
            api_key,
            model: model.to_string(),
            completion_base_url: non_empty(config.completion.base_url.as_deref()),
            timeout: Duration::from_secs(config.completion.timeout_secs.max(1)),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn pick<F>(lookup: &F, env: &str, file_value: Option<&str>) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup(env).as_deref()).or_else(|| non_empty(file_value))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var(ENV_CONFIG_PATH).map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".line-relay").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (or RELAY_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
