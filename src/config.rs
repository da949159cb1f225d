use crate::error::{ProxyError, Result};
use crate::providers::Provider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Value for `Access-Control-Allow-Origin`; `*` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_origin: Option<String>,
    /// Return Anthropic responses as-is instead of normalizing them.
    #[serde(default)]
    pub anthropic_passthrough: bool,
    /// Upstream request timeout. No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub keys: ServerKeys,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

/// Server-side API keys, one per provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
}

/// Base URL overrides. Unset entries fall back to the registry default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
}

fn default_port() -> u16 {
    3001
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            allowed_origin: None,
            anthropic_passthrough: false,
            request_timeout_secs: None,
            keys: ServerKeys::default(),
            endpoints: EndpointsConfig::default(),
        }
    }
}

impl ServerKeys {
    /// The configured key for `provider`, treating empty strings as absent.
    #[must_use]
    pub fn get(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::OpenAi => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::Gemini => &self.gemini,
        };
        key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn set(&mut self, provider: Provider, key: impl Into<String>) {
        let slot = match provider {
            Provider::OpenAi => &mut self.openai,
            Provider::Anthropic => &mut self.anthropic,
            Provider::Gemini => &mut self.gemini,
        };
        *slot = Some(key.into());
    }
}

impl EndpointsConfig {
    fn get(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::OpenAi => self.openai.as_deref(),
            Provider::Anthropic => self.anthropic.as_deref(),
            Provider::Gemini => self.gemini.as_deref(),
        }
    }
}

impl ProxyConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file, falling back to defaults
    /// when none exists. Priority: CLI arg > CWD > XDG config > home dir
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using defaults and environment");
        Ok(Self::default())
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Overlay values from `lookup`. Empty values are ignored, so an unset
    /// variable and `FOO=` behave the same.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        for provider in Provider::ALL {
            if let Some(key) = get(provider.info().api_key_env) {
                self.keys.set(provider, key);
            }
        }

        if let Some(origin) = get("ALLOWED_ORIGIN") {
            self.allowed_origin = Some(origin);
        }

        if let Some(port) = get("PORT") {
            self.port = port
                .parse()
                .map_err(|_| ProxyError::config(format!("Invalid PORT value '{port}'")))?;
        }

        Ok(())
    }

    /// Resolve the effective base URL (config override or registry default)
    #[must_use]
    pub fn base_url(&self, provider: Provider) -> String {
        self.endpoints
            .get(provider)
            .unwrap_or(provider.info().default_base_url)
            .trim_end_matches('/')
            .to_string()
    }

    #[must_use]
    pub fn cors_origin(&self) -> &str {
        self.allowed_origin
            .as_deref()
            .filter(|o| !o.is_empty())
            .unwrap_or("*")
    }
}

/// Load `.env` from the working directory or its parents into the process
/// environment. Returns the file used, or `None` when there is none.
pub fn load_dotenv() -> Result<Option<PathBuf>> {
    dotenv_outcome(dotenvy::dotenv())
}

fn dotenv_outcome(result: std::result::Result<PathBuf, dotenvy::Error>) -> Result<Option<PathBuf>> {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ProxyError::config(format!("Failed to load .env: {e}"))),
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("writing-proxy.toml"));

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("writing-proxy").join("config.toml"));
    }
    if let Some(home) = dirs_path() {
        paths.push(home.join(".config").join("writing-proxy").join("config.toml"));
        paths.push(home.join(".writing-proxy.toml"));
    }

    paths
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
