use crate::config::ProxyConfig;
use crate::dispatch::{self, AnalyzeRequest};
use crate::error::{ProxyError, Result};
use crate::logging::SharedLogger;
use crate::models::{all_models, DEFAULT_MODEL_ID};
use crate::providers::{available_providers, ProviderAvailability};

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub client: reqwest::Client,
    pub logger: SharedLogger,
}

impl AppState {
    /// Build state with an HTTP client honoring the configured timeout.
    pub fn new(config: ProxyConfig, logger: SharedLogger) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            config,
            client: builder.build()?,
            logger,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let origin = state.config.cors_origin();
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!(origin, "Invalid allowed origin, falling back to '*'");
                AllowOrigin::any()
            }
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    // OPTIONS never reaches the routes: the CORS layer answers it with an
    // empty 200.
    Router::new()
        .route(
            "/api/analyze",
            post(handle_analyze).fallback(method_not_allowed),
        )
        .route(
            "/api/providers",
            get(handle_providers).fallback(method_not_allowed),
        )
        .route("/api/models", get(handle_models).fallback(method_not_allowed))
        .route("/health", get(handle_health).fallback(method_not_allowed))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse the analyze body from raw bytes. An absent body and an unparseable
/// one are reported differently.
pub fn parse_analyze_body(body: &[u8]) -> Result<AnalyzeRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ProxyError::malformed("Missing JSON body"));
    }

    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| ProxyError::malformed("Invalid JSON body"))?;
    if value.is_null() {
        return Err(ProxyError::malformed("Missing JSON body"));
    }

    serde_json::from_value(value).map_err(|_| ProxyError::malformed("Invalid JSON body"))
}

async fn handle_analyze(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req = match parse_analyze_body(&body) {
        Ok(r) => r,
        Err(e) => return error_response(&state, &e),
    };

    match dispatch::analyze(&req, &state.config, &state.client, &state.logger).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(&state, &e),
    }
}

async fn handle_providers(State(state): State<Arc<AppState>>) -> Json<ProviderAvailability> {
    Json(available_providers(&state.config.keys))
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

async fn handle_models() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "default_model": DEFAULT_MODEL_ID,
        "data": all_models(),
    }))
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// The single place errors are turned into responses. Full detail goes to
/// the logs; callers only see it for 4xx.
fn error_response(state: &AppState, err: &ProxyError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), error = %err, "Proxy error");
    } else {
        tracing::warn!(status = status.as_u16(), error = %err, "Request rejected");
    }
    state
        .logger
        .error("server", format!("Proxy error ({}): {}", status.as_u16(), err));

    (
        status,
        Json(serde_json::json!({ "error": err.client_message() })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed_message(body: &[u8]) -> String {
        match parse_analyze_body(body).unwrap_err() {
            ProxyError::MalformedRequest { message } => message,
            other => panic!("expected malformed request, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_body() {
        assert_eq!(malformed_message(b""), "Missing JSON body");
        assert_eq!(malformed_message(b"  \n"), "Missing JSON body");
        assert_eq!(malformed_message(b"null"), "Missing JSON body");
    }

    #[test]
    fn test_invalid_body() {
        assert_eq!(malformed_message(b"{not json"), "Invalid JSON body");
        assert_eq!(
            malformed_message(br#"{"model":"gpt-4.1-nano","messages":"hi"}"#),
            "Invalid JSON body"
        );
    }

    #[test]
    fn test_valid_body() {
        let req = parse_analyze_body(
            br#"{"model":"gemini-2.5-flash","messages":[{"role":"user","content":"x"}]}"#,
        )
        .unwrap();
        assert_eq!(req.model, "gemini-2.5-flash");
        assert_eq!(req.messages.len(), 1);
    }

    #[test]
    fn test_state_with_timeout() {
        let config = ProxyConfig {
            request_timeout_secs: Some(30),
            ..ProxyConfig::default()
        };
        let state = AppState::new(config, SharedLogger::in_memory()).unwrap();
        assert_eq!(state.config.request_timeout_secs, Some(30));
    }
}
