//! Data models and structures
//!
//! Defines the inbound request shapes the study assistant sends, the unified
//! request/reply types the proxy works with, and the startup configuration.

use crate::ai::gemini::client::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Netlify's synchronous function payload limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

/// Body of the passthrough route: the client already owns the full conversation.
///
/// Turns are kept as raw JSON and forwarded untouched.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassthroughRequest {
    pub chat_history: Vec<Value>,
}

/// Body of the composed route: prior turns plus the pieces of a new user turn.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedRequest {
    pub history: Vec<Value>,
    #[serde(default)]
    pub prompt: Option<String>,
    /// `data:<mime>;base64,<payload>` URL.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub file_content: Option<String>,
    /// `null` and a missing key both mean unstructured.
    #[serde(default)]
    pub structured: Option<bool>,
}

impl ComposedRequest {
    pub fn is_structured(&self) -> bool {
        self.structured.unwrap_or(false)
    }
}

/// Request variant handled by [`crate::proxy::Proxy`].
#[derive(Debug, Clone)]
pub enum ProxyRequest {
    Passthrough(Vec<Value>),
    Composed(ComposedRequest),
}

impl ProxyRequest {
    pub fn variant(&self) -> &'static str {
        match self {
            ProxyRequest::Passthrough(_) => "passthrough",
            ProxyRequest::Composed(_) => "composed",
        }
    }
}

impl From<PassthroughRequest> for ProxyRequest {
    fn from(request: PassthroughRequest) -> Self {
        ProxyRequest::Passthrough(request.chat_history)
    }
}

impl From<ComposedRequest> for ProxyRequest {
    fn from(request: ComposedRequest) -> Self {
        ProxyRequest::Composed(request)
    }
}

/// Successful proxy outcome, shaped per request variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyReply {
    /// Upstream JSON relayed as-is.
    Relay(Value),
    /// First candidate's first text part, if any.
    Text(Option<String>),
}

/// Upstream API secret. `Debug` never prints the key.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::MissingConfig("GEMINI_API_KEY is empty".to_string()));
        }
        Ok(Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: ApiKey,
    pub model: String,
    pub base_url: String,
    pub max_body_bytes: usize,
}

impl Config {
    /// Reads configuration once at startup, loading `.env` if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .ok_or_else(|| Error::MissingConfig("GEMINI_API_KEY not set".to_string()))
            .and_then(ApiKey::new)?;

        let max_body_bytes = match setting(&lookup, "MAX_BODY_BYTES") {
            Some(raw) => raw.parse().map_err(|_| {
                Error::InvalidConfig(format!("MAX_BODY_BYTES must be a byte count, got '{}'", raw))
            })?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Self {
            api_key,
            model: setting(&lookup, "GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: setting(&lookup, "GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_body_bytes,
        })
    }
}

/// Optional setting; blank values count as unset.
fn setting<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
