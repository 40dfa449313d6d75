//! Configuration loading with env-var overrides.
//!
//! Tuning values come from an optional TOML file: `$RELAY_CONFIG` if set,
//! otherwise `config/default.toml` relative to the working directory when it
//! exists, otherwise built-in defaults. Secrets (`TELEGRAM_TOKEN`,
//! `OPENAI_API_KEY`, `HF_TOKEN`) and deployment settings (`WEBHOOK_URL`,
//! `PORT`) are only ever read from the environment.
//!
//! The resolved [`Config`] is immutable and built once in `main`.

use std::{
    env, fs,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
};

use reqwest::Url;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::error::AppError;
use crate::logger;

/// Path tried when `RELAY_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Path segment prefixed to the bot token in the webhook URL.
pub const WEBHOOK_PATH_PREFIX: &str = "/webhook";

/// Primary (OpenAI-compatible) completion tier, from `[primary]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    pub model: String,
    /// Upper bound on completion length, sent as `max_tokens`.
    pub max_tokens: u32,
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// Fallback text-generation tier, from `[fallback]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackConfig {
    /// Inference endpoint root; the model id is appended as a path segment.
    pub api_base_url: String,
    /// Model hub root used to confirm the model exists before first use.
    pub hub_url: String,
    pub model: String,
    pub max_new_tokens: u32,
    pub do_sample: bool,
    /// Look the model up on the hub before first use. Off for self-hosted endpoints.
    pub verify_model: bool,
    pub timeout_seconds: u64,
}

/// How Telegram delivers updates to the process.
#[derive(Clone, PartialEq)]
pub enum Delivery {
    /// Pull-style: long-poll `getUpdates`.
    Polling,
    /// Push-style: Telegram POSTs updates to `url`; we listen on `listen`.
    Webhook {
        /// Public base URL as configured, without the token-bearing path.
        public_base: String,
        /// Full registered URL: `{public_base}/webhook/{token}`.
        url: Url,
        listen: SocketAddr,
    },
}

impl std::fmt::Debug for Delivery {
    // The full webhook URL embeds the bot token.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delivery::Polling => f.write_str("Polling"),
            Delivery::Webhook { public_base, listen, .. } => f
                .debug_struct("Webhook")
                .field("public_base", public_base)
                .field("listen", listen)
                .finish_non_exhaustive(),
        }
    }
}

/// Fully-resolved process configuration.
#[derive(Clone)]
pub struct Config {
    pub telegram_token: String,
    /// `OPENAI_API_KEY`. `None` skips the primary tier entirely.
    pub primary_api_key: Option<String>,
    /// `HF_TOKEN`, sent as a bearer token to the fallback service.
    pub fallback_token: Option<String>,
    /// Validated `[relay] log_level`, overridden by `RELAY_LOG_LEVEL`.
    pub log_level: LevelFilter,
    pub primary: PrimaryConfig,
    pub fallback: FallbackConfig,
    pub delivery: Delivery,
}

/// Values sourced from the process environment.
///
/// Tests build this directly instead of mutating env vars.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub telegram_token: Option<String>,
    pub openai_api_key: Option<String>,
    pub hf_token: Option<String>,
    pub webhook_url: Option<String>,
    pub port: Option<String>,
    pub log_level: Option<String>,
}

impl EnvOverrides {
    /// Read all relevant variables. Empty values are treated as unset.
    pub fn from_env() -> Self {
        Self {
            telegram_token: non_empty_var("TELEGRAM_TOKEN"),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            hf_token: non_empty_var("HF_TOKEN"),
            webhook_url: non_empty_var("WEBHOOK_URL"),
            port: non_empty_var("PORT"),
            log_level: non_empty_var("RELAY_LOG_LEVEL"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    relay: RawRelay,
    #[serde(default)]
    primary: RawPrimary,
    #[serde(default)]
    fallback: RawFallback,
    #[serde(default)]
    webhook: RawWebhook,
}

#[derive(Deserialize)]
struct RawRelay {
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawRelay {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

#[derive(Deserialize)]
struct RawPrimary {
    #[serde(default = "default_primary_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_primary_model")]
    model: String,
    #[serde(default = "default_primary_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_primary_temperature")]
    temperature: f32,
    #[serde(default = "default_primary_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawPrimary {
    fn default() -> Self {
        Self {
            api_base_url: default_primary_api_base_url(),
            model: default_primary_model(),
            max_tokens: default_primary_max_tokens(),
            temperature: default_primary_temperature(),
            timeout_seconds: default_primary_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawFallback {
    #[serde(default = "default_fallback_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_fallback_hub_url")]
    hub_url: String,
    #[serde(default = "default_fallback_model")]
    model: String,
    #[serde(default = "default_fallback_max_new_tokens")]
    max_new_tokens: u32,
    #[serde(default = "default_true")]
    do_sample: bool,
    #[serde(default = "default_true")]
    verify_model: bool,
    #[serde(default = "default_fallback_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawFallback {
    fn default() -> Self {
        Self {
            api_base_url: default_fallback_api_base_url(),
            hub_url: default_fallback_hub_url(),
            model: default_fallback_model(),
            max_new_tokens: default_fallback_max_new_tokens(),
            do_sample: true,
            verify_model: true,
            timeout_seconds: default_fallback_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawWebhook {
    #[serde(default = "default_webhook_listen")]
    listen: String,
    #[serde(default = "default_webhook_port")]
    port: u16,
}

impl Default for RawWebhook {
    fn default() -> Self {
        Self { listen: default_webhook_listen(), port: default_webhook_port() }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_primary_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_primary_model() -> String { "gpt-3.5-turbo".to_string() }
fn default_primary_max_tokens() -> u32 { 300 }
fn default_primary_temperature() -> f32 { 0.7 }
fn default_primary_timeout_seconds() -> u64 { 60 }
fn default_fallback_api_base_url() -> String { "https://api-inference.huggingface.co/models".to_string() }
fn default_fallback_hub_url() -> String { "https://huggingface.co".to_string() }
fn default_fallback_model() -> String { "gpt2".to_string() }
fn default_fallback_max_new_tokens() -> u32 { 150 }
fn default_fallback_timeout_seconds() -> u64 { 120 }
fn default_webhook_listen() -> String { "0.0.0.0".to_string() }
fn default_webhook_port() -> u16 { 8443 }

fn default_true() -> bool {
    true
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load config from the environment and the optional TOML file.
pub fn load() -> Result<Config, AppError> {
    let overrides = EnvOverrides::from_env();
    let path = match non_empty_var("RELAY_CONFIG") {
        Some(p) => Some(expand_home(&p)),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        }
    };
    load_from(path.as_deref(), &overrides)
}

/// Internal loader. Accepts an explicit (optional) path and env values.
///
/// An explicit path that cannot be read is an error; `None` means defaults.
pub fn load_from(path: Option<&Path>, env: &EnvOverrides) -> Result<Config, AppError> {
    let raw = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
            toml::from_str::<RawConfig>(&text)
                .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?
        }
        None => RawConfig::default(),
    };

    let telegram_token = env
        .telegram_token
        .clone()
        .ok_or_else(|| AppError::Config("TELEGRAM_TOKEN is not set".into()))?;

    let delivery = resolve_delivery(&raw.webhook, env, &telegram_token)?;
    let log_level = logger::parse_level(env.log_level.as_deref().unwrap_or(&raw.relay.log_level))?;

    let p = raw.primary;
    let f = raw.fallback;

    Ok(Config {
        telegram_token,
        primary_api_key: env.openai_api_key.clone(),
        fallback_token: env.hf_token.clone(),
        log_level,
        primary: PrimaryConfig {
            api_base_url: p.api_base_url,
            model: p.model,
            max_tokens: p.max_tokens,
            temperature: p.temperature,
            timeout_seconds: p.timeout_seconds,
        },
        fallback: FallbackConfig {
            api_base_url: f.api_base_url,
            hub_url: f.hub_url,
            model: f.model,
            max_new_tokens: f.max_new_tokens,
            do_sample: f.do_sample,
            verify_model: f.verify_model,
            timeout_seconds: f.timeout_seconds,
        },
        delivery,
    })
}

fn resolve_delivery(
    raw: &RawWebhook,
    env: &EnvOverrides,
    token: &str,
) -> Result<Delivery, AppError> {
    let Some(base) = env.webhook_url.as_deref() else {
        return Ok(Delivery::Polling);
    };

    let port = match env.port.as_deref() {
        Some(p) => p
            .trim()
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("PORT must be a port number, got '{p}': {e}")))?,
        None => raw.port,
    };
    let ip: IpAddr = raw
        .listen
        .parse()
        .map_err(|e| AppError::Config(format!("invalid webhook listen address '{}': {e}", raw.listen)))?;

    let public_base = base.trim_end_matches('/').to_string();
    let url = Url::parse(&format!("{public_base}{WEBHOOK_PATH_PREFIX}/{token}"))
        .map_err(|e| AppError::Config(format!("invalid WEBHOOK_URL '{public_base}': {e}")))?;

    Ok(Delivery::Webhook { public_base, url, listen: SocketAddr::new(ip, port) })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

impl EnvOverrides {
    /// Minimal environment for tests: a token and nothing else.
    #[cfg(test)]
    pub fn with_token(token: &str) -> Self {
        Self { telegram_token: Some(token.to_string()), ..Self::default() }
    }
}
