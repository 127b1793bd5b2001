//! Completion gateway: the slow, possibly failing provider behind the relay.
//!
//! [`LlmClient`] speaks the OpenAI-compatible chat completions API. HTTP 429 maps to
//! [`CompletionError::RateLimited`]; every other failure is [`CompletionError::Upstream`].

use std::time::Duration;

use async_trait::async_trait;
use omni_window::PromptMessage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered prompt ending in the new question.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Role-tagged history, oldest first, new question last.
    pub messages: Vec<PromptMessage>,
    /// Continuation handle of the newest answered turn in the window.
    pub parent_id: Option<String>,
}

/// Provider answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Answer text.
    pub text: String,
    /// Continuation handle for the next request, when the provider returns one.
    pub parent_id: Option<String>,
}

/// Gateway failure taxonomy.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Provider throttled the request.
    #[error("completion provider rate limited the request")]
    RateLimited,
    /// Any other provider or transport failure.
    #[error("completion provider failed: {0}")]
    Upstream(String),
}

/// Text-completion capability. Latency is unbounded; failure is possible at any time.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Submit one prompt.
    async fn submit(&self, request: CompletionRequest) -> Result<Completion, CompletionError>;
}

/// Request body for chat completions (OpenAI format).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_message_id: Option<&'a str>,
}

/// Response: id + choices[0].message.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    id: Option<String>,
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for chat completions.
pub struct LlmClient {
    client: reqwest::Client,
    inference_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    /// Build a client; `request_timeout` bounds one HTTP exchange.
    pub fn new(
        inference_url: String,
        model: String,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!(error = %error, "failed to build http client; using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            inference_url,
            model,
            api_key,
        }
    }
}

#[async_trait]
impl CompletionGateway for LlmClient {
    async fn submit(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &request.messages,
            parent_message_id: request.parent_id.as_deref(),
        };
        let mut req = self
            .client
            .post(&self.inference_url)
            .json(&body)
            .header("Content-Type", "application/json");
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }
        let res = req
            .send()
            .await
            .map_err(|e| CompletionError::Upstream(format!("request failed: {e}")))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| CompletionError::Upstream(format!("response read failed: {e}")))?;
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CompletionError::RateLimited);
        }
        if !status.is_success() {
            return Err(CompletionError::Upstream(format!(
                "LLM API error {status}: {text}"
            )));
        }
        let parsed: ChatCompletionResponse = serde_json::from_str(&text).map_err(|e| {
            CompletionError::Upstream(format!("LLM response parse error: {e}; body: {text}"))
        })?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::Upstream("LLM response has no choices".to_string()))?;
        let content = choice.message.content.unwrap_or_default();
        Ok(Completion {
            text: normalize_answer(&content),
            parent_id: parsed.id,
        })
    }
}

/// Drop the first blank-line separator some providers prepend to answers.
pub(crate) fn normalize_answer(text: &str) -> String {
    text.replacen("\n\n", "", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_answer_removes_only_first_separator() {
        assert_eq!(normalize_answer("\n\nhi\n\nthere"), "hi\n\nthere");
        assert_eq!(normalize_answer("plain"), "plain");
    }

    #[test]
    fn request_body_omits_absent_parent_id() {
        let messages = vec![PromptMessage::user("hello")];
        let body = ChatCompletionRequest {
            model: "m",
            messages: &messages,
            parent_message_id: None,
        };
        let json = serde_json::to_value(&body).unwrap_or_default();
        assert!(json.get("parent_message_id").is_none());
        assert_eq!(
            json.pointer("/messages/0/role").and_then(|v| v.as_str()),
            Some("user")
        );
    }
}
