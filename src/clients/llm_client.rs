//! LLM (OpenRouter) API client module
//!
//! Encapsulates all chat-completion calls used to research products and to
//! write report JSON.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::core::config::AppConfig;
use crate::errors::PortalError;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(300))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// One chat-completion call.
#[derive(Debug)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatCompletionMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Sent as `X-Title` so calls can be told apart in the provider dashboard.
    pub title: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
    pub elapsed_ms: u64,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, PortalError>;
}

#[must_use]
pub fn text_message(role: MessageRole, text: &str) -> ChatCompletionMessage {
    ChatCompletionMessage {
        role,
        content: Content::Text(text.to_string()),
        name: None,
        tool_calls: None,
        tool_call_id: None,
    }
}

/// Optional system prompt followed by a single user turn.
#[must_use]
pub fn build_messages(system: Option<&str>, user: &str) -> Vec<ChatCompletionMessage> {
    let mut chat = Vec::with_capacity(2);
    if let Some(system) = system.filter(|s| !s.trim().is_empty()) {
        chat.push(text_message(MessageRole::system, system));
    }
    chat.push(text_message(MessageRole::user, user));
    chat
}

/// USD per million tokens for the model family.
#[must_use]
pub fn price_per_million(model: &str) -> f64 {
    let model = model.to_ascii_lowercase();
    if model.contains("opus") {
        15.0
    } else if model.contains("haiku") {
        1.0
    } else {
        3.0
    }
}

#[must_use]
pub fn estimate_cost(model: &str, total_tokens: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let tokens = total_tokens as f64;
    tokens / 1_000_000.0 * price_per_million(model)
}

fn message_json(msg: &ChatCompletionMessage) -> Value {
    let role_str = match msg.role {
        MessageRole::system => "system",
        MessageRole::user => "user",
        MessageRole::assistant => "assistant",
        MessageRole::function => "function",
        MessageRole::tool => "tool",
    };

    let content_val = match &msg.content {
        Content::Text(text) => json!(text),
        Content::ImageUrl(urls) => {
            let url_objects: Vec<Value> = urls
                .iter()
                .filter_map(|u| u.image_url.as_ref())
                .map(|img| json!({ "type": "image_url", "image_url": { "url": img.url } }))
                .collect();
            json!(url_objects)
        }
    };

    json!({ "role": role_str, "content": content_val })
}

/// Pulls the assistant text and usage out of a chat-completions response body.
///
/// # Errors
///
/// Returns an error when the body carries no non-empty message content.
pub fn parse_completion(body: &Value) -> Result<(String, Usage), PortalError> {
    let text = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PortalError::LlmError("Empty response from LLM".to_string()))?;

    let count = |key: &str| {
        body.get("usage")
            .and_then(|u| u.get(key))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };

    Ok((
        text.to_string(),
        Usage {
            prompt_tokens: count("prompt_tokens"),
            completion_tokens: count("completion_tokens"),
            total_tokens: count("total_tokens"),
        },
    ))
}

/// LLM API client for an OpenAI-compatible chat-completions endpoint
pub struct LlmClient {
    api_key: String,
    base_url: String,
    referer: String,
}

impl LlmClient {
    #[must_use]
    pub fn new(api_key: String, base_url: String, referer: String) -> Self {
        Self {
            api_key,
            base_url,
            referer,
        }
    }

    /// # Errors
    ///
    /// Returns an error if `OPENROUTER_API_KEY` is not configured.
    pub fn from_config(config: &AppConfig) -> Result<Self, PortalError> {
        let api_key = config
            .openrouter_api_key
            .clone()
            .ok_or_else(PortalError::llm_not_configured)?;
        Ok(Self::new(
            api_key,
            config.llm_base_url.clone(),
            config.llm_referer.clone(),
        ))
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, PortalError> {
        #[cfg(feature = "debug-logs")]
        info!("Using LLM prompt:\n{:?}", request.messages);

        info!(
            model = %request.model,
            title = %request.title,
            messages = request.messages.len(),
            "Calling LLM"
        );
        let started = Instant::now();

        let request_body = json!({
            "model": request.model,
            "messages": request.messages.iter().map(message_json).collect::<Vec<_>>(),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let response = HTTP_CLIENT
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &request.title)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| PortalError::HttpError(format!("LLM API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, "LLM API error: {}", error_text);
            return Err(PortalError::LlmError(format!("{status}: {error_text}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PortalError::LlmError(format!("Failed to parse LLM response: {e}")))?;

        let (text, usage) = parse_completion(&body)?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            title = %request.title,
            total_tokens = usage.total_tokens,
            elapsed_ms,
            "LLM response received"
        );

        Ok(Completion {
            text,
            usage,
            elapsed_ms,
        })
    }
}
