//! Provider adapters.
//!
//! Each adapter turns the provider-agnostic `{model, messages}` pair into one
//! provider's wire format, performs a single POST, and normalizes the reply
//! into [`AnalysisResult`]. Request building and response normalization are
//! pure functions; only `call` does I/O.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use crate::error::{ProxyError, Result};
use crate::logging::{LogLevel, RequestLogger};
use crate::providers::Provider;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Output token cap applied to every provider call.
pub const MAX_OUTPUT_TOKENS: u32 = 1000;

/// Message author. Unrecognized roles are kept verbatim and forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// The common response shape every adapter normalizes into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub content: Vec<ContentBlock>,
    pub model: String,
    pub usage: Usage,
}

impl AnalysisResult {
    pub fn text(text: impl Into<String>, model: impl Into<String>, usage: Usage) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            model: model.into(),
            usage,
        }
    }

    /// Text of the first content block, or `""`.
    #[must_use]
    pub fn first_text(&self) -> &str {
        match self.content.first() {
            Some(ContentBlock::Text { text }) => text,
            None => "",
        }
    }
}

/// What the analyze endpoint hands back. `Raw` only occurs for Anthropic with
/// passthrough enabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalyzeResponse {
    Normalized(AnalysisResult),
    Raw(serde_json::Value),
}

impl From<AnalysisResult> for AnalyzeResponse {
    fn from(result: AnalysisResult) -> Self {
        Self::Normalized(result)
    }
}

/// Fail with a configuration error when there is no usable key.
pub(crate) fn require_key(provider: Provider, api_key: Option<&str>) -> Result<&str> {
    api_key.filter(|k| !k.is_empty()).ok_or_else(|| {
        ProxyError::config(format!("{} is not set", provider.info().api_key_env))
    })
}

/// Send a prepared request and return the body of a 2xx response.
///
/// Non-2xx responses are logged with their full body and turned into
/// `ProxyError::Upstream` carrying the provider's status.
pub(crate) async fn send(
    provider: Provider,
    request: reqwest::RequestBuilder,
    log: &RequestLogger,
) -> Result<String> {
    let label = provider.info().label;
    let response = request.send().await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::error!(
            provider = label,
            status = status.as_u16(),
            body = %body,
            "Upstream request failed"
        );
        log.log(
            LogLevel::Error,
            provider.as_str(),
            format!(
                "[{}] {} {}",
                label,
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            ),
            Some(serde_json::json!({ "status": status.as_u16(), "body": body })),
        );
        return Err(ProxyError::upstream(
            status.as_u16(),
            format!("{} error {}: {}", label, status.as_u16(), body),
        ));
    }

    log.debug(
        provider.as_str(),
        format!("Response status={} body_len={}", status.as_u16(), body.len()),
    );

    Ok(body)
}

pub(crate) fn parse_body<T: DeserializeOwned>(provider: Provider, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        ProxyError::translation(format!(
            "Failed to parse {} response: {}. Body: {}",
            provider.info().label,
            e,
            truncate(body, 300)
        ))
    })
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
