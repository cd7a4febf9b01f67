//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.omnichat/config.json`) and environment.
//! The webhook URL is never compiled in; it comes from the file or `OMNICHAT_WEBHOOK_URL`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Outbound webhook settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Selectable spaces sent alongside each message.
    #[serde(default)]
    pub spaces: SpacesConfig,

    /// Where the login flag is persisted.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Webhook endpoint and request timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Endpoint receiving `POST {message, space?}`. Overridden by OMNICHAT_WEBHOOK_URL env.
    #[serde(default)]
    pub url: Option<String>,

    /// Request timeout in seconds (default 60). Overridden by OMNICHAT_WEBHOOK_TIMEOUT_SECS env.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Space selector: the enumerated choices and the initial selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacesConfig {
    /// Allowed space identifiers. Empty means requests carry no space at all.
    #[serde(default = "default_space_options")]
    pub options: Vec<String>,

    /// Initially selected space. Falls back to the first option when unset or not in `options`.
    #[serde(default)]
    pub default: Option<String>,
}

/// Session persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Key-value store file. Relative paths are resolved against the config file's parent.
    /// Default: `storage.json` next to the config file.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_space_options() -> Vec<String> {
    vec!["INFRAD".to_string(), "OMNIPRO".to_string()]
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SpacesConfig {
    fn default() -> Self {
        Self {
            options: default_space_options(),
            default: None,
        }
    }
}

impl SpacesConfig {
    /// The space selected at start-up, or None in the single-space variant.
    pub fn initial(&self) -> Option<String> {
        self.default
            .as_ref()
            .filter(|d| self.options.contains(d))
            .or_else(|| self.options.first())
            .cloned()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the webhook URL: env OMNICHAT_WEBHOOK_URL overrides config.
pub fn resolve_webhook_url(config: &Config) -> Option<String> {
    webhook_url_with_override(config, std::env::var("OMNICHAT_WEBHOOK_URL").ok())
}

fn webhook_url_with_override(config: &Config, env: Option<String>) -> Option<String> {
    non_empty(env).or_else(|| non_empty(config.webhook.url.clone()))
}

/// Resolve the request timeout: env OMNICHAT_WEBHOOK_TIMEOUT_SECS overrides config.
/// A zero or unparsable value falls back to the configured one.
pub fn resolve_timeout(config: &Config) -> Duration {
    timeout_with_override(config, std::env::var("OMNICHAT_WEBHOOK_TIMEOUT_SECS").ok())
}

fn timeout_with_override(config: &Config, env: Option<String>) -> Duration {
    let secs = non_empty(env)
        .and_then(|s| match s.parse::<u64>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                log::warn!("ignoring invalid OMNICHAT_WEBHOOK_TIMEOUT_SECS: {}", s);
                None
            }
        })
        .unwrap_or(config.webhook.timeout_secs);
    Duration::from_secs(secs.max(1))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("OMNICHAT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".omnichat").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

fn config_parent(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Resolve the key-value store file: `session.storePath` if set (relative paths resolved
/// against the config file's parent), otherwise `storage.json` beside the config file.
pub fn resolve_store_path(config: &Config, config_path: &Path) -> PathBuf {
    let parent = config_parent(config_path);
    match &config.session.store_path {
        Some(p) if !p.as_os_str().is_empty() => {
            if p.is_absolute() {
                p.clone()
            } else {
                parent.join(p)
            }
        }
        _ => parent.join("storage.json"),
    }
}

/// Load config from the given path (or OMNICHAT_CONFIG_PATH / default). Missing file => default config.
/// Returns the config and the path that was used (for resolving the store path).
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
