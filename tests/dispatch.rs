use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use writing_proxy::adapters::{AnalyzeResponse, ChatMessage};
use writing_proxy::keys::ClientKeys;
use writing_proxy::models::estimate_cost;
use writing_proxy::suggestions::{parse_suggestions, ExplanationLanguage, SuggestionSet};
use writing_proxy::{analyze, AnalyzeRequest, ProxyConfig, ProxyError, SharedLogger};

const DRAFT: &str = "There is a few concerns I'd like to adress before we move forward.";

fn config_for(server: &MockServer) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.endpoints.openai = Some(server.uri());
    config.endpoints.anthropic = Some(server.uri());
    config.endpoints.gemini = Some(server.uri());
    config
}

fn user_request(model: &str) -> AnalyzeRequest {
    AnalyzeRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::user("Analyze")],
        client_keys: None,
    }
}

#[tokio::test]
async fn test_recognized_model_without_key_fails_before_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let client = reqwest::Client::new();
    let logger = SharedLogger::in_memory();

    for model in ["gpt-4o-mini", "o3-mini", "claude-haiku-4-5-20251001", "gemini-2.5-flash"] {
        let err = analyze(&user_request(model), &config, &client, &logger)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Config { .. }), "{model}: {err:?}");
    }
}

#[tokio::test]
async fn test_server_key_used_when_client_has_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "[]"}}],
            "model": "o4-mini-2025-04-16"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.keys.openai = Some("sk-server".to_string());

    let resp = analyze(
        &user_request("o4-mini"),
        &config,
        &reqwest::Client::new(),
        &SharedLogger::in_memory(),
    )
    .await
    .unwrap();

    let AnalyzeResponse::Normalized(result) = resp else {
        panic!("expected normalized response");
    };
    assert_eq!(result.model, "o4-mini-2025-04-16");
    assert_eq!(result.usage.input_tokens, 0);
}

#[tokio::test]
async fn test_anthropic_passthrough_flag() {
    let server = MockServer::start().await;
    let native = json!({
        "id": "msg_1",
        "type": "message",
        "model": "claude-haiku-4-5-20251001",
        "content": [{"type": "text", "text": "[]"}],
        "usage": {"input_tokens": 3, "output_tokens": 1}
    });
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(native.clone()))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.keys.anthropic = Some("sk-ant".to_string());
    config.anthropic_passthrough = true;

    let resp = analyze(
        &user_request("claude-haiku-4-5-20251001"),
        &config,
        &reqwest::Client::new(),
        &SharedLogger::in_memory(),
    )
    .await
    .unwrap();

    assert_eq!(resp, AnalyzeResponse::Raw(native));
}

#[tokio::test]
async fn test_upstream_failure_is_journaled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .mount(&server)
        .await;

    let logger = SharedLogger::in_memory();
    let mut req = user_request("gemini-2.5-flash-lite");
    req.client_keys = Some(ClientKeys {
        gemini: Some("g".to_string()),
        ..ClientKeys::default()
    });

    let err = analyze(&req, &config_for(&server), &reqwest::Client::new(), &logger)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);

    let journal = logger.recent(10);
    let failure = journal
        .iter()
        .find(|e| e.component == "gemini" && e.context.is_some())
        .expect("upstream failure should be journaled");
    assert_eq!(failure.context.as_ref().unwrap()["body"], "permission denied");
    assert!(failure.request_id.is_some());
}

#[tokio::test]
async fn test_analysis_round_trip_to_edited_text() {
    let server = MockServer::start().await;
    let reply = r#"[
        {"type": "grammar", "original": "There is a few", "suggestion": "There are a few", "explanation": "Subject-verb agreement"},
        {"type": "spelling", "original": "adress", "suggestion": "address", "explanation": "Misspelling"}
    ]"#;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "g-client"))
        .and(body_partial_json(json!({"generationConfig": {"maxOutputTokens": 1000}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": reply}]}}],
            "usageMetadata": {"promptTokenCount": 200000, "candidatesTokenCount": 50000}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let req = AnalyzeRequest::for_text(
        "gemini-2.5-flash",
        DRAFT,
        ExplanationLanguage::English,
        Some(ClientKeys {
            gemini: Some("g-client".to_string()),
            ..ClientKeys::default()
        }),
    );

    let resp = analyze(
        &req,
        &config_for(&server),
        &reqwest::Client::new(),
        &SharedLogger::in_memory(),
    )
    .await
    .unwrap();
    let AnalyzeResponse::Normalized(result) = resp else {
        panic!("expected normalized response");
    };

    let cost = estimate_cost(&result.model, &result.usage).unwrap();
    assert!((cost - 0.04).abs() < 1e-9);

    let mut set = SuggestionSet::new(DRAFT, parse_suggestions(result.first_text()).unwrap());
    assert!(set.accept_all_pending(None).is_empty());
    assert_eq!(
        set.apply(),
        "There are a few concerns I'd like to address before we move forward."
    );
}
