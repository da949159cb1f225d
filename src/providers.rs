//! Built-in provider registry and model classification.
//!
//! Each provider entry defines the default base URL and the environment
//! variable that carries the server-side API key. Model identifiers are
//! routed to a provider purely by prefix.

use crate::config::ServerKeys;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Gemini,
}

#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub provider: Provider,
    pub name: &'static str,
    pub display_name: &'static str,
    /// Short label used in upstream error messages and logs.
    pub label: &'static str,
    pub api_key_env: &'static str,
    pub default_base_url: &'static str,
}

const REGISTRY: &[ProviderInfo] = &[
    ProviderInfo {
        provider: Provider::OpenAi,
        name: "openai",
        display_name: "OpenAI",
        label: "OpenAI",
        api_key_env: "OPENAI_API_KEY",
        default_base_url: "https://api.openai.com/v1",
    },
    ProviderInfo {
        provider: Provider::Anthropic,
        name: "anthropic",
        display_name: "Anthropic",
        label: "Anthropic",
        api_key_env: "ANTHROPIC_API_KEY",
        default_base_url: "https://api.anthropic.com",
    },
    ProviderInfo {
        provider: Provider::Gemini,
        name: "gemini",
        display_name: "Google Gemini",
        label: "Gemini",
        api_key_env: "GEMINI_API_KEY",
        default_base_url: "https://generativelanguage.googleapis.com/v1",
    },
];

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Anthropic, Provider::Gemini];

    #[must_use]
    pub fn info(self) -> &'static ProviderInfo {
        match self {
            Provider::OpenAi => &REGISTRY[0],
            Provider::Anthropic => &REGISTRY[1],
            Provider::Gemini => &REGISTRY[2],
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.info().name
    }

    /// Exact, lowercase name lookup (`"openai"`, `"anthropic"`, `"gemini"`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Provider> {
        REGISTRY.iter().find(|p| p.name == name).map(|p| p.provider)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[must_use]
pub fn registry() -> &'static [ProviderInfo] {
    REGISTRY
}

/// Route a model id to its provider. Case-sensitive prefix match, first rule
/// wins; `None` for anything unrecognized.
#[must_use]
pub fn classify_model(model_id: &str) -> Option<Provider> {
    const OPENAI_PREFIXES: &[&str] = &["gpt-", "o1", "o3", "o4"];

    if OPENAI_PREFIXES.iter().any(|p| model_id.starts_with(p)) {
        Some(Provider::OpenAi)
    } else if model_id.starts_with("claude-") {
        Some(Provider::Anthropic)
    } else if model_id.starts_with("gemini-") {
        Some(Provider::Gemini)
    } else {
        None
    }
}

/// Which providers have a server-side key configured. This is a hint for the
/// client UI, not an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAvailability {
    pub openai: bool,
    pub anthropic: bool,
    pub gemini: bool,
}

#[must_use]
pub fn available_providers(keys: &ServerKeys) -> ProviderAvailability {
    ProviderAvailability {
        openai: keys.get(Provider::OpenAi).is_some(),
        anthropic: keys.get(Provider::Anthropic).is_some(),
        gemini: keys.get(Provider::Gemini).is_some(),
    }
}
