// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::provider::{
    CustomBodyFormat, DEFAULT_TIMEOUT, InvokeOptions, LOCAL_TIMEOUT, Provider, ProviderKind,
    Transport, TransportError, normalize_url, require_model,
};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    model: String,
    transport: Transport,
}

impl OpenAiProvider {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_url(base_url, "ai.base_url")?,
            api_key: api_key.trim().to_owned(),
            model: require_model(model)?,
            transport: Transport::new(DEFAULT_TIMEOUT)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Provider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn invoke(
        &self,
        system: &str,
        user: &str,
        options: &InvokeOptions,
    ) -> Result<String, TransportError> {
        let request = ChatRequest {
            model: options.model.as_deref().unwrap_or(&self.model),
            messages: role_tagged(system, user),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };
        let authorization = format!("Bearer {}", self.api_key);
        let headers: Vec<(&str, &str)> = if self.api_key.is_empty() {
            Vec::new()
        } else {
            vec![("Authorization", authorization.as_str())]
        };

        let parsed: ChatCompletionResponse = self.transport.post_json(
            &format!("{}/chat/completions", self.base_url),
            &headers,
            &request,
            options,
            "chat response",
        )?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                TransportError::MissingContent("no choices in chat response".to_owned())
            })
    }
}

#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    model: String,
    transport: Transport,
}

impl AnthropicProvider {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_url(base_url, "ai.base_url")?,
            api_key: api_key.trim().to_owned(),
            model: require_model(model)?,
            transport: Transport::new(DEFAULT_TIMEOUT)?,
        })
    }
}

impl Provider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn invoke(
        &self,
        system: &str,
        user: &str,
        options: &InvokeOptions,
    ) -> Result<String, TransportError> {
        let request = MessagesRequest {
            model: options.model.as_deref().unwrap_or(&self.model),
            system,
            messages: vec![ChatMessage {
                role: "user",
                content: user,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };
        let headers = [
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_VERSION),
        ];

        let parsed: MessagesResponse = self.transport.post_json(
            &format!("{}/v1/messages", self.base_url),
            &headers,
            &request,
            options,
            "messages response",
        )?;
        let text: Vec<String> = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(TransportError::MissingContent(
                "no text blocks in messages response".to_owned(),
            ));
        }
        Ok(text.join(""))
    }
}

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    transport: Transport,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        // Accept the OpenAI-compatible `/v1` base some setups configure.
        let base_url = normalize_url(base_url, "ai.base_url")?;
        let base_url = base_url.trim_end_matches("/v1").to_owned();
        Ok(Self {
            base_url,
            model: require_model(model)?,
            transport: Transport::new(LOCAL_TIMEOUT)?,
        })
    }
}

impl Provider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn invoke(
        &self,
        system: &str,
        user: &str,
        options: &InvokeOptions,
    ) -> Result<String, TransportError> {
        let request = OllamaChatRequest {
            model: options.model.as_deref().unwrap_or(&self.model),
            messages: role_tagged(system, user),
            stream: false,
            format: options.json_mode.then_some("json"),
            options: OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        let parsed: OllamaChatResponse = self.transport.post_json(
            &format!("{}/api/chat", self.base_url),
            &[],
            &request,
            options,
            "chat response",
        )?;
        parsed
            .message
            .map(|message| message.content)
            .ok_or_else(|| {
                TransportError::MissingContent("no message in chat response".to_owned())
            })
    }
}

pub type TransformFn = Arc<dyn Fn(&JsonValue) -> Option<String> + Send + Sync>;

/// Any JSON endpoint the caller controls. Replies are unwrapped by the
/// optional transform, then by probing well-known fields, and finally by
/// returning the whole payload as text.
#[derive(Clone)]
pub struct CustomProvider {
    endpoint: String,
    model: Option<String>,
    headers: BTreeMap<String, String>,
    body_format: CustomBodyFormat,
    transform: Option<TransformFn>,
    transport: Transport,
}

impl fmt::Debug for CustomProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("body_format", &self.body_format)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

impl CustomProvider {
    pub fn new(endpoint: &str) -> Result<Self> {
        Ok(Self {
            endpoint: normalize_url(endpoint, "ai.base_url")?,
            model: None,
            headers: BTreeMap::new(),
            body_format: CustomBodyFormat::default(),
            transform: None,
            transport: Transport::new(DEFAULT_TIMEOUT)?,
        })
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model.filter(|model| !model.trim().is_empty());
        self
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body_format(mut self, body_format: CustomBodyFormat) -> Self {
        self.body_format = body_format;
        self
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&JsonValue) -> Option<String> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }
}

impl Provider for CustomProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Custom
    }

    fn invoke(
        &self,
        system: &str,
        user: &str,
        options: &InvokeOptions,
    ) -> Result<String, TransportError> {
        let model = options.model.as_deref().or(self.model.as_deref());
        let mut body = serde_json::Map::new();
        if let Some(model) = model {
            body.insert("model".to_owned(), model.into());
        }
        match self.body_format {
            CustomBodyFormat::Messages => {
                let messages = serde_json::to_value(role_tagged(system, user)).map_err(|error| {
                    TransportError::Decode {
                        context: "request body",
                        message: error.to_string(),
                    }
                })?;
                body.insert("messages".to_owned(), messages);
            }
            CustomBodyFormat::Prompt => {
                body.insert("prompt".to_owned(), format!("{system}\n\n{user}").into());
            }
        }
        body.insert("temperature".to_owned(), options.temperature.into());
        body.insert("max_tokens".to_owned(), options.max_tokens.into());

        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        let payload: JsonValue = self.transport.post_json(
            &self.endpoint,
            &headers,
            &JsonValue::Object(body),
            options,
            "custom response",
        )?;

        if let Some(transform) = &self.transform
            && let Some(text) = transform(&payload)
        {
            return Ok(text);
        }
        Ok(probe_text(&payload).unwrap_or_else(|| payload.to_string()))
    }
}

/// Looks for reply text in the fields common completion APIs use.
pub fn probe_text(payload: &JsonValue) -> Option<String> {
    for key in ["content", "text", "output", "response"] {
        if let Some(text) = payload.get(key).and_then(JsonValue::as_str) {
            return Some(text.to_owned());
        }
    }
    let first_choice = payload.get("choices")?.get(0)?;
    first_choice
        .get("text")
        .and_then(JsonValue::as_str)
        .or_else(|| first_choice.pointer("/message/content")?.as_str())
        .map(str::to_owned)
}

fn role_tagged<'a>(system: &'a str, user: &'a str) -> Vec<ChatMessage<'a>> {
    vec![
        ChatMessage {
            role: "system",
            content: system,
        },
        ChatMessage {
            role: "user",
            content: user,
        },
    ]
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::probe_text;
    use serde_json::json;

    #[test]
    fn probe_text_checks_common_fields_in_order() {
        assert_eq!(
            probe_text(&json!({"content": "a", "text": "b"})),
            Some("a".to_owned())
        );
        assert_eq!(probe_text(&json!({"output": "c"})), Some("c".to_owned()));
        assert_eq!(probe_text(&json!({"response": "d"})), Some("d".to_owned()));
        assert_eq!(
            probe_text(&json!({"choices": [{"text": "e"}]})),
            Some("e".to_owned())
        );
        assert_eq!(
            probe_text(&json!({"choices": [{"message": {"content": "f"}}]})),
            Some("f".to_owned())
        );
    }

    #[test]
    fn probe_text_ignores_non_string_fields() {
        assert_eq!(probe_text(&json!({"content": [1, 2]})), None);
        assert_eq!(probe_text(&json!({"choices": []})), None);
        assert_eq!(probe_text(&json!("bare")), None);
    }
}
