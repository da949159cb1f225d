//! Anthropic Messages adapter.
//!
//! By default the Messages response is normalized like every other provider.
//! With passthrough enabled the provider body is returned untouched, which is
//! what older editor builds expect.

use super::{
    parse_body, require_key, send, AnalysisResult, AnalyzeResponse, ChatMessage, Usage,
    MAX_OUTPUT_TOKENS,
};
use crate::error::Result;
use crate::logging::RequestLogger;
use crate::providers::Provider;
use serde::{Deserialize, Serialize};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub usage: Option<MessagesUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesUsage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

#[must_use]
pub fn build_request(model: &str, messages: &[ChatMessage]) -> MessagesRequest {
    MessagesRequest {
        model: model.to_string(),
        max_tokens: MAX_OUTPUT_TOKENS,
        messages: messages.to_vec(),
    }
}

#[must_use]
pub fn normalize_response(resp: MessagesResponse, requested_model: &str) -> AnalysisResult {
    let text = resp
        .content
        .into_iter()
        .find(|b| b.block_type == "text")
        .and_then(|b| b.text)
        .unwrap_or_default();

    let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
        input_tokens: u.input_tokens.unwrap_or(0),
        output_tokens: u.output_tokens.unwrap_or(0),
    });

    AnalysisResult::text(
        text,
        resp.model.unwrap_or_else(|| requested_model.to_string()),
        usage,
    )
}

pub async fn call(
    client: &reqwest::Client,
    base_url: &str,
    model: &str,
    messages: &[ChatMessage],
    api_key: Option<&str>,
    passthrough: bool,
    log: &RequestLogger,
) -> Result<AnalyzeResponse> {
    let api_key = require_key(Provider::Anthropic, api_key)?;
    let url = format!("{}/v1/messages", base_url.trim_end_matches('/'));

    log.info(
        "anthropic",
        format!("POST {} model={} passthrough={}", url, model, passthrough),
    );

    let request = client
        .post(&url)
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&build_request(model, messages));

    let body = send(Provider::Anthropic, request, log).await?;

    if passthrough {
        let raw: serde_json::Value = parse_body(Provider::Anthropic, &body)?;
        return Ok(AnalyzeResponse::Raw(raw));
    }

    let resp: MessagesResponse = parse_body(Provider::Anthropic, &body)?;
    Ok(normalize_response(resp, model).into())
}
