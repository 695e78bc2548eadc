// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::backends::{AnthropicProvider, CustomProvider, OllamaProvider, OpenAiProvider};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const LOCAL_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Ollama,
    Custom,
}

impl ProviderKind {
    pub const ALL: [Self; 4] = [Self::OpenAi, Self::Anthropic, Self::Ollama, Self::Custom];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
            Self::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot reach {url}: {message}")]
    Connect { url: String, message: String },

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("server error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("decode {context}: {message}")]
    Decode {
        context: &'static str,
        message: String,
    },

    #[error("{0}")]
    MissingContent(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvokeOptions {
    /// Overrides the provider's configured model.
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Overrides the provider's default request timeout.
    pub timeout: Option<Duration>,
    pub json_mode: bool,
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: None,
            json_mode: true,
            extra_headers: BTreeMap::new(),
        }
    }
}

/// A text-completion backend: system and user prompt in, raw reply text out.
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn invoke(
        &self,
        system: &str,
        user: &str,
        options: &InvokeOptions,
    ) -> Result<String, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomBodyFormat {
    /// `{"messages": [{"role": "system", ...}, {"role": "user", ...}]}`
    #[default]
    Messages,
    /// `{"prompt": "<system>\n\n<user>"}`
    Prompt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default = "default_openai_url")]
        base_url: String,
        #[serde(default)]
        api_key: String,
        model: String,
    },
    Anthropic {
        #[serde(default = "default_anthropic_url")]
        base_url: String,
        #[serde(default)]
        api_key: String,
        model: String,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        model: String,
    },
    Custom {
        endpoint: String,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        body_format: CustomBodyFormat,
    },
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::OpenAi { .. } => ProviderKind::OpenAi,
            Self::Anthropic { .. } => ProviderKind::Anthropic,
            Self::Ollama { .. } => ProviderKind::Ollama,
            Self::Custom { .. } => ProviderKind::Custom,
        }
    }
}

pub fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_owned()
}

pub fn default_anthropic_url() -> String {
    "https://api.anthropic.com".to_owned()
}

pub fn default_ollama_url() -> String {
    "http://localhost:11434".to_owned()
}

pub fn build_provider(config: &ProviderConfig) -> Result<Box<dyn Provider>> {
    let provider: Box<dyn Provider> = match config {
        ProviderConfig::OpenAi {
            base_url,
            api_key,
            model,
        } => Box::new(OpenAiProvider::new(base_url, api_key, model)?),
        ProviderConfig::Anthropic {
            base_url,
            api_key,
            model,
        } => Box::new(AnthropicProvider::new(base_url, api_key, model)?),
        ProviderConfig::Ollama { base_url, model } => {
            Box::new(OllamaProvider::new(base_url, model)?)
        }
        ProviderConfig::Custom {
            endpoint,
            model,
            headers,
            body_format,
        } => Box::new(
            CustomProvider::new(endpoint)?
                .with_model(model.clone())
                .with_headers(headers.clone())
                .with_body_format(*body_format),
        ),
    };
    tracing::debug!(kind = provider.kind().as_str(), "built provider");
    Ok(provider)
}

/// Validates an http(s) URL and strips trailing slashes.
pub(crate) fn normalize_url(raw: &str, field: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("{field} must not be empty");
    }
    let parsed = Url::parse(trimmed)
        .with_context(|| format!("{field} is not a valid URL: {trimmed:?}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("{field} must use http or https, got {:?}", parsed.scheme());
    }
    Ok(trimmed.to_owned())
}

pub(crate) fn require_model(model: &str) -> Result<String> {
    let model = model.trim();
    if model.is_empty() {
        bail!("ai.model must not be empty");
    }
    Ok(model.to_owned())
}

/// Blocking JSON-over-HTTP plumbing shared by every backend.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    http: HttpClient,
    default_timeout: Duration,
}

impl Transport {
    pub(crate) fn new(default_timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            default_timeout,
        })
    }

    pub(crate) fn post_json<B, R>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
        options: &InvokeOptions,
        context: &'static str,
    ) -> Result<R, TransportError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let mut request = self.http.post(url).timeout(timeout).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        for (name, value) in &options.extra_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .map_err(|error| send_error(url, timeout, error))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|error| send_error(url, timeout, error))?;
        if !status.is_success() {
            return Err(clean_error_response(status, &text));
        }

        serde_json::from_str(&text).map_err(|error| TransportError::Decode {
            context,
            message: error.to_string(),
        })
    }
}

fn send_error(url: &str, timeout: Duration, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout(timeout);
    }
    TransportError::Connect {
        url: url.to_owned(),
        message: error.to_string(),
    }
}

const MAX_ERROR_BODY: usize = 500;

pub(crate) fn clean_error_response(status: StatusCode, body: &str) -> TransportError {
    let status = status.as_u16();

    if let Ok(parsed) = serde_json::from_str::<NestedErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.message.is_empty()
    {
        return TransportError::Status {
            status,
            body: error.message,
        };
    }

    if let Ok(parsed) = serde_json::from_str::<FlatErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.is_empty()
    {
        return TransportError::Status {
            status,
            body: error,
        };
    }

    let trimmed = body.trim();
    let body = match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_owned(),
    };
    TransportError::Status { status, body }
}

/// OpenAI and Anthropic: `{"error": {"message": "..."}}`.
#[derive(Debug, Deserialize)]
struct NestedErrorEnvelope {
    error: Option<NestedErrorBody>,
}

#[derive(Debug, Deserialize)]
struct NestedErrorBody {
    message: String,
}

/// Ollama: `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct FlatErrorEnvelope {
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{
        CustomBodyFormat, InvokeOptions, ProviderConfig, ProviderKind, TransportError,
        build_provider, clean_error_response, normalize_url,
    };
    use anyhow::Result;
    use reqwest::StatusCode;
    use std::time::Duration;

    #[test]
    fn provider_kind_round_trips_names() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ProviderKind::parse(" OpenAI "), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::parse("gemini"), None);
    }

    #[test]
    fn invoke_defaults_favor_deterministic_json() {
        let options = InvokeOptions::default();
        assert!((options.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(options.max_tokens, 1000);
        assert!(options.json_mode);
        assert!(options.timeout.is_none());
    }

    #[test]
    fn clean_error_response_prefers_envelope_messages() {
        let nested = clean_error_response(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"bad key","type":"auth"}}"#,
        );
        assert_eq!(nested.to_string(), "server error (401): bad key");

        let flat = clean_error_response(StatusCode::NOT_FOUND, r#"{"error":"model not found"}"#);
        assert_eq!(flat.to_string(), "server error (404): model not found");

        let plain = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "boom\n");
        assert_eq!(plain.to_string(), "server error (500): boom");
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(2_000);
        let TransportError::Status { body, .. } =
            clean_error_response(StatusCode::BAD_GATEWAY, &body)
        else {
            panic!("expected a status error");
        };
        assert_eq!(body.len(), 503);
    }

    #[test]
    fn timeout_message_names_the_budget() {
        let error = TransportError::Timeout(Duration::from_secs(30));
        assert_eq!(error.to_string(), "request timed out after 30s");
    }

    #[test]
    fn normalize_url_rejects_non_http_schemes() {
        assert_eq!(
            normalize_url("http://localhost:11434/", "ai.base_url").ok(),
            Some("http://localhost:11434".to_owned())
        );
        assert!(normalize_url("ftp://example.com", "ai.base_url").is_err());
        assert!(normalize_url("   ", "ai.base_url").is_err());
        assert!(normalize_url("not a url", "ai.base_url").is_err());
    }

    #[test]
    fn provider_config_is_tagged_by_kind() -> Result<()> {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"kind":"ollama","model":"qwen3"}"#)?;
        assert_eq!(
            config,
            ProviderConfig::Ollama {
                base_url: "http://localhost:11434".to_owned(),
                model: "qwen3".to_owned(),
            }
        );

        let custom: ProviderConfig = serde_json::from_str(
            r#"{"kind":"custom","endpoint":"http://127.0.0.1:9/run","body_format":"prompt"}"#,
        )?;
        assert_eq!(custom.kind(), ProviderKind::Custom);
        assert!(matches!(
            custom,
            ProviderConfig::Custom {
                body_format: CustomBodyFormat::Prompt,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn build_provider_maps_each_kind() -> Result<()> {
        let configs = [
            ProviderConfig::OpenAi {
                base_url: "https://api.openai.com/v1".to_owned(),
                api_key: "sk-test".to_owned(),
                model: "gpt-4o-mini".to_owned(),
            },
            ProviderConfig::Anthropic {
                base_url: "https://api.anthropic.com".to_owned(),
                api_key: "key".to_owned(),
                model: "claude-test".to_owned(),
            },
            ProviderConfig::Ollama {
                base_url: "http://localhost:11434".to_owned(),
                model: "qwen3".to_owned(),
            },
            ProviderConfig::Custom {
                endpoint: "http://localhost:8080/complete".to_owned(),
                model: None,
                headers: Default::default(),
                body_format: CustomBodyFormat::Messages,
            },
        ];
        for config in configs {
            let provider = build_provider(&config)?;
            assert_eq!(provider.kind(), config.kind());
        }
        Ok(())
    }

    #[test]
    fn build_provider_rejects_empty_model() {
        let error = build_provider(&ProviderConfig::Ollama {
            base_url: "http://localhost:11434".to_owned(),
            model: "  ".to_owned(),
        })
        .err()
        .map(|error| error.to_string());
        assert_eq!(error.as_deref(), Some("ai.model must not be empty"));
    }
}
