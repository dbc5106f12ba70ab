//! Client configuration.
//!
//! Values come from, in order of precedence: the process environment, a `.env`
//! file (loaded by `load_dotenv`), and the defaults bundled into the binary.

use std::time::Duration;

use crate::ai::{ChatError, ChatResult};

/// Bundled defaults for builds that ship without a `.env`.
const BUNDLED_CONFIG: &str = include_str!("../assets/config.env");

pub const API_URL_VAR: &str = "VITE_AI_CHAT_API_URL";
pub const N8N_URL_VAR: &str = "VITE_N8N_RAG_CHAT_URL";
pub const USER_EMAIL_VAR: &str = "HEARTH_USER_EMAIL";
pub const CONNECT_TIMEOUT_VAR: &str = "HEARTH_CONNECT_TIMEOUT_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Base URL of the SSE endpoint; `/chat/stream` is appended.
    pub api_url: String,
    /// Selects the N8N backend when set.
    pub n8n_webhook_url: Option<String>,
    pub user_email: Option<String>,
    pub connect_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            n8n_webhook_url: None,
            user_email: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Load `.env` into the process environment. Existing variables are kept.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "failed to read .env"),
    }
}

/// Look up `key` in the bundled defaults.
fn bundled(key: &str) -> Option<String> {
    for line in BUNDLED_CONFIG.lines() {
        let line = line.trim();
        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=')
            && k.trim() == key
        {
            return Some(v.trim().to_string());
        }
    }
    None
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ChatConfig {
    pub fn from_env() -> ChatResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| bundled(key)))
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ChatResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = non_empty(lookup(API_URL_VAR)).unwrap_or_else(|| DEFAULT_API_URL.into());

        let connect_timeout = match non_empty(lookup(CONNECT_TIMEOUT_VAR)) {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| {
                    ChatError::Config(format!("{CONNECT_TIMEOUT_VAR} must be whole seconds, got {raw:?}"))
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_url,
            n8n_webhook_url: non_empty(lookup(N8N_URL_VAR)),
            user_email: non_empty(lookup(USER_EMAIL_VAR)),
            connect_timeout,
        })
    }

    pub fn uses_n8n(&self) -> bool {
        self.n8n_webhook_url.is_some()
    }
}
