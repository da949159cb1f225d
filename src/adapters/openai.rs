//! OpenAI Chat Completions adapter.

use super::{parse_body, require_key, send, AnalysisResult, ChatMessage, Usage, MAX_OUTPUT_TOKENS};
use crate::error::Result;
use crate::logging::RequestLogger;
use crate::providers::Provider;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub max_completion_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
}

#[must_use]
pub fn build_request(model: &str, messages: &[ChatMessage]) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        max_completion_tokens: MAX_OUTPUT_TOKENS,
        messages: messages.to_vec(),
    }
}

/// OpenAI reports the model it actually served (often a dated snapshot);
/// that is what ends up in the result.
#[must_use]
pub fn normalize_response(resp: ChatCompletionResponse, requested_model: &str) -> AnalysisResult {
    let text = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default();

    let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
        input_tokens: u.prompt_tokens.unwrap_or(0),
        output_tokens: u.completion_tokens.unwrap_or(0),
    });

    let model = resp.model.unwrap_or_else(|| requested_model.to_string());

    AnalysisResult::text(text, model, usage)
}

pub async fn call(
    client: &reqwest::Client,
    base_url: &str,
    model: &str,
    messages: &[ChatMessage],
    api_key: Option<&str>,
    log: &RequestLogger,
) -> Result<AnalysisResult> {
    let api_key = require_key(Provider::OpenAi, api_key)?;
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    log.info("openai", format!("POST {} model={}", url, model));

    let request = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&build_request(model, messages));

    let body = send(Provider::OpenAi, request, log).await?;
    let resp: ChatCompletionResponse = parse_body(Provider::OpenAi, &body)?;

    Ok(normalize_response(resp, model))
}
