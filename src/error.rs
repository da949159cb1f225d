//! Error types for the proxy.

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    #[error("{message}")]
    Config { message: String },

    #[error("Unknown model: {model}")]
    UnknownModel { model: String },

    #[error("{message}")]
    MalformedRequest { message: String },

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Translation error: {message}")]
    Translation { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl ProxyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unknown_model(model: impl Into<String>) -> Self {
        Self::UnknownModel {
            model: model.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: msg.into(),
        }
    }

    pub fn upstream(status: u16, msg: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: msg.into(),
        }
    }

    pub fn translation(msg: impl Into<String>) -> Self {
        Self::Translation {
            message: msg.into(),
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// HTTP status this error is reported with.
    ///
    /// Upstream failures mirror the provider's status; anything without a
    /// status of its own is a 500.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownModel { .. } | Self::MalformedRequest { .. } => 400,
            Self::Upstream { status, .. } if (100..=599).contains(status) => *status,
            _ => 500,
        }
    }

    /// Message safe to hand back to the caller. Server-side failures are
    /// collapsed to a generic message; the detail only goes to the logs.
    #[must_use]
    pub fn client_message(&self) -> String {
        if self.status_code() >= 500 {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_is_client_error() {
        let err = ProxyError::unknown_model("unknown-model-xyz");
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.client_message(), "Unknown model: unknown-model-xyz");
    }

    #[test]
    fn test_upstream_4xx_passes_detail_through() {
        let err = ProxyError::upstream(401, "OpenAI error 401: bad key");
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.client_message(), "OpenAI error 401: bad key");
    }

    #[test]
    fn test_upstream_5xx_is_sanitized() {
        let err = ProxyError::upstream(503, "Gemini error 503: overloaded");
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_config_error_is_500() {
        let err = ProxyError::config("OPENAI_API_KEY is not set");
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_bogus_upstream_status_falls_back_to_500() {
        assert_eq!(ProxyError::upstream(0, "weird").status_code(), 500);
        assert_eq!(ProxyError::upstream(1000, "weird").status_code(), 500);
    }
}
