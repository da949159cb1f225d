//! Google Gemini `generateContent` adapter.

use super::{parse_body, require_key, send, AnalysisResult, ChatMessage, Role, Usage, MAX_OUTPUT_TOKENS};
use crate::error::Result;
use crate::logging::RequestLogger;
use crate::providers::Provider;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: Option<u64>,
    #[serde(default)]
    pub candidates_token_count: Option<u64>,
}

/// Gemini calls the assistant side `model`; everything else is `user`.
fn gemini_role(role: &Role) -> &'static str {
    match role {
        Role::Assistant => "model",
        Role::User | Role::System | Role::Other(_) => "user",
    }
}

#[must_use]
pub fn build_request(messages: &[ChatMessage]) -> GenerateContentRequest {
    let contents = messages
        .iter()
        .map(|m| Content {
            role: Some(gemini_role(&m.role).to_string()),
            parts: vec![Part {
                text: Some(m.content.clone()),
            }],
        })
        .collect();

    GenerateContentRequest {
        contents,
        generation_config: GenerationConfig {
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

/// Gemini does not echo the model back, so the requested id is reported.
#[must_use]
pub fn normalize_response(resp: GenerateContentResponse, requested_model: &str) -> AnalysisResult {
    let text = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .unwrap_or_default();

    let usage = resp.usage_metadata.map_or_else(Usage::default, |u| Usage {
        input_tokens: u.prompt_token_count.unwrap_or(0),
        output_tokens: u.candidates_token_count.unwrap_or(0),
    });

    AnalysisResult::text(text, requested_model, usage)
}

pub async fn call(
    client: &reqwest::Client,
    base_url: &str,
    model: &str,
    messages: &[ChatMessage],
    api_key: Option<&str>,
    log: &RequestLogger,
) -> Result<AnalysisResult> {
    let api_key = require_key(Provider::Gemini, api_key)?;
    let url = format!(
        "{}/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    );

    log.info("gemini", format!("POST {}", url));

    let request = client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&build_request(messages));

    let body = send(Provider::Gemini, request, log).await?;
    let resp: GenerateContentResponse = parse_body(Provider::Gemini, &body)?;

    Ok(normalize_response(resp, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::SharedLogger;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_assistant_becomes_model() {
        let req = build_request(&[ChatMessage::assistant("hi")]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["contents"][0]["role"], "model");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1000);
    }

    #[test]
    fn test_user_and_system_become_user() {
        let messages = vec![
            ChatMessage {
                role: Role::System,
                content: "be terse".to_string(),
            },
            ChatMessage::user("check this"),
        ];
        let req = build_request(&messages);
        let roles: Vec<_> = req
            .contents
            .iter()
            .map(|c| c.role.as_deref().unwrap())
            .collect();
        assert_eq!(roles, ["user", "user"]);
    }

    #[test]
    fn test_unknown_role_becomes_user() {
        let message: ChatMessage =
            serde_json::from_str(r#"{"role":"tool","content":"lookup result"}"#).unwrap();
        assert_eq!(message.role, Role::Other("tool".to_string()));

        let json = serde_json::to_value(build_request(&[message])).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "lookup result");
    }

    #[test]
    fn test_normalize_empty_candidates() {
        let resp: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({"candidates": []})).unwrap();
        let result = normalize_response(resp, "gemini-2.5-flash");
        assert_eq!(result.first_text(), "");
        assert_eq!(result.model, "gemini-2.5-flash");
        assert_eq!(result.usage, Usage::default());
    }

    #[tokio::test]
    async fn test_call_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_json(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "Analyze"}]}],
                "generationConfig": {"maxOutputTokens": 1000}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "[]"}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {
                    "promptTokenCount": 30,
                    "candidatesTokenCount": 2,
                    "totalTokenCount": 32
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let result = call(
            &client,
            &mock_server.uri(),
            "gemini-2.5-flash",
            &[ChatMessage::user("Analyze")],
            Some("g-key"),
            &SharedLogger::in_memory().for_request("t"),
        )
        .await
        .unwrap();

        assert_eq!(result.first_text(), "[]");
        assert_eq!(result.model, "gemini-2.5-flash");
        assert_eq!(
            result.usage,
            Usage {
                input_tokens: 30,
                output_tokens: 2
            }
        );
    }

    #[tokio::test]
    async fn test_server_error_keeps_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = call(
            &client,
            &mock_server.uri(),
            "gemini-2.5-flash",
            &[ChatMessage::user("Analyze")],
            Some("g-key"),
            &SharedLogger::in_memory().for_request("t"),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), 503);
        assert_eq!(err.to_string(), "Gemini error 503: overloaded");
        assert_eq!(err.client_message(), "Internal server error");
    }
}
