use crate::adapters::{anthropic, gemini, openai, AnalyzeResponse, ChatMessage};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::keys::{resolve_key, ClientKeys};
use crate::logging::SharedLogger;
use crate::providers::{classify_model, Provider};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/analyze`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, rename = "clientKeys", skip_serializing_if = "Option::is_none")]
    pub client_keys: Option<ClientKeys>,
}

/// Route a request to the adapter for its model and return the adapter's
/// result unchanged. Nothing is retried and nothing is kept between calls.
pub async fn analyze(
    req: &AnalyzeRequest,
    config: &ProxyConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<AnalyzeResponse> {
    let provider =
        classify_model(&req.model).ok_or_else(|| ProxyError::unknown_model(&req.model))?;

    let log = logger.for_request(uuid::Uuid::new_v4().to_string());
    let api_key = resolve_key(provider, req.client_keys.as_ref(), &config.keys);
    let base_url = config.base_url(provider);

    tracing::info!(
        request_id = log.request_id(),
        provider = %provider,
        model = %req.model,
        messages = req.messages.len(),
        client_key = req.client_keys.as_ref().and_then(|k| k.get(provider)).is_some(),
        "Dispatching analysis"
    );
    log.info(
        "dispatch",
        format!(
            "model={} provider={} messages={}",
            req.model,
            provider,
            req.messages.len()
        ),
    );

    let key = api_key.as_deref();
    let response: AnalyzeResponse = match provider {
        Provider::OpenAi => openai::call(client, &base_url, &req.model, &req.messages, key, &log)
            .await?
            .into(),
        Provider::Anthropic => {
            anthropic::call(
                client,
                &base_url,
                &req.model,
                &req.messages,
                key,
                config.anthropic_passthrough,
                &log,
            )
            .await?
        }
        Provider::Gemini => gemini::call(client, &base_url, &req.model, &req.messages, key, &log)
            .await?
            .into(),
    };

    if let AnalyzeResponse::Normalized(ref result) = response {
        log.info(
            "dispatch",
            format!(
                "Completed: in={} out={} tokens",
                result.usage.input_tokens, result.usage.output_tokens
            ),
        );
    }

    Ok(response)
}
