//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! The search prompt goes out as one user message; the first choice's text
//! comes back untouched apart from trimming. No retries.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::http;
use crate::llm::{LlmResponse, LlmUsage, ProviderError};

/// Adapter for OpenAI and compatible servers (Ollama, LM Studio, vLLM…).
/// Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// `api_key`, when present, is sent as `Authorization: Bearer <key>`.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = http::client(timeout_seconds).map_err(ProviderError::Request)?;
        Ok(Self { client, api_base_url, model, temperature, api_key })
    }

    pub async fn complete(&self, prompt: &str) -> Result<LlmResponse, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: accepts_temperature(&self.model).then_some(self.temperature),
        };
        debug!(model = %self.model, prompt_len = prompt.len(), "sending completion request");
        if tracing::enabled!(tracing::Level::TRACE) {
            trace!(%prompt, "completion prompt");
        }

        let mut builder = self.client.post(&self.api_base_url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, timeout = e.is_timeout(), "completion request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;
        let response = http::success_or_message(response).await.map_err(|message| {
            error!(%message, "completion request returned HTTP error");
            ProviderError::Request(message)
        })?;

        let body = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::Request(format!("failed to parse response body: {e}")))?;
        let usage = body.usage.map(LlmUsage::from);

        let text = body
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::Request("empty or missing content in response".into()))?;

        debug!(reply_len = text.len(), ?usage, "received completion");
        Ok(LlmResponse { text, usage })
    }
}

/// gpt-5 family models reject an explicit temperature.
fn accepts_temperature(model: &str) -> bool {
    !model.starts_with("gpt-5")
}

// ── wire types ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
    #[serde(default)]
    prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Deserialize)]
struct PromptTokensDetails {
    #[serde(default)]
    cached_tokens: u64,
}

impl From<Usage> for LlmUsage {
    fn from(u: Usage) -> Self {
        LlmUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            cached_input_tokens: u.prompt_tokens_details.map_or(0, |d| d.cached_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_prompt_as_single_user_message() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: [ChatMessage { role: "user", content: "find a mouse" }],
            temperature: Some(0.2),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "find a mouse");
        assert!(json.get("temperature").is_some());
    }

    #[test]
    fn gpt5_models_omit_temperature() {
        assert!(!accepts_temperature("gpt-5-mini"));
        assert!(accepts_temperature("gpt-4o-mini"));
    }

    #[test]
    fn response_usage_maps_cached_tokens() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":" [{\"id\":42}] "}}],
                "usage":{"prompt_tokens":120,"completion_tokens":8,
                         "prompt_tokens_details":{"cached_tokens":64}}}"#,
        )
        .unwrap();
        let usage = LlmUsage::from(body.usage.unwrap());
        assert_eq!(usage, LlmUsage { input_tokens: 120, output_tokens: 8, cached_input_tokens: 64 });
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_error() {
        let p = OpenAiCompatibleProvider::new(
            "http://127.0.0.1:9/v1/chat/completions".into(),
            "test-model".into(),
            0.0,
            2,
            None,
        )
        .unwrap();
        let err = p.complete("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)));
    }
}
