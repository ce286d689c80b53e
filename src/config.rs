use crate::error::{ChatError, ChatResult, EnvVarError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::{Host, Url};

pub const ENDPOINT_ENV: &str = "KRISHI_CHAT_ENDPOINT";
pub const API_KEY_ENV: &str = "KRISHI_CHAT_API_KEY";
pub const MODEL_ENV: &str = "KRISHI_CHAT_MODEL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Full URL of the chat-completion endpoint
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Shown as the first assistant message, never sent upstream
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            model: None,
            system_prompt: None,
            greeting: None,
            connect_timeout_secs: None,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> ChatResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> ChatResult<Self> {
        let endpoint = std::env::var(ENDPOINT_ENV).map_err(|_| EnvVarError {
            var: ENDPOINT_ENV.to_string(),
            instructions: Some("Set it to the chat-completion URL of the AI gateway".to_string()),
        })?;
        let mut config = Self::new(endpoint);
        config.api_key = std::env::var(API_KEY_ENV).ok();
        config.model = std::env::var(MODEL_ENV).ok();
        config.validate()?;
        Ok(config)
    }

    /// Bearer credential: the configured key, else `KRISHI_CHAT_API_KEY`.
    pub fn api_key(&self) -> ChatResult<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.clone());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                EnvVarError {
                    var: API_KEY_ENV.to_string(),
                    instructions: Some(
                        "Use a short-lived token issued by the marketplace backend".to_string(),
                    ),
                }
                .into()
            })
    }

    /// Endpoint must parse and use HTTPS. Plain HTTP is allowed for loopback only.
    pub fn validate(&self) -> ChatResult<Url> {
        let url = Url::parse(&self.endpoint)?;
        match url.scheme() {
            "https" => Ok(url),
            "http" if is_loopback(&url) => Ok(url),
            scheme => Err(ChatError::Configuration(format!(
                "endpoint must use https, got {scheme}://"
            ))),
        }
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost",
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
