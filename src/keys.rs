//! API key resolution: a key supplied by the client wins over the key the
//! server was started with.

use crate::config::ServerKeys;
use crate::providers::Provider;
use serde::{Deserialize, Serialize};

/// Per-provider keys held by the end user and sent with each request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
}

impl ClientKeys {
    #[must_use]
    pub fn get(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::OpenAi => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::Gemini => &self.gemini,
        };
        key.as_deref().filter(|k| !k.is_empty())
    }
}

/// Effective key for `provider`, or `None` if neither side has one.
#[must_use]
pub fn resolve_key(
    provider: Provider,
    client_keys: Option<&ClientKeys>,
    server_keys: &ServerKeys,
) -> Option<String> {
    client_keys
        .and_then(|keys| keys.get(provider))
        .or_else(|| server_keys.get(provider))
        .map(str::to_string)
}
