//! Static LLM provider: answers every prompt with one configured reply.
//!
//! Useful for offline demos (`[llm.static] reply = "[{\"id\": 1}]"`) and for
//! driving the search pipeline deterministically in tests.

use std::sync::Arc;

use crate::llm::{LlmResponse, ProviderError};

#[derive(Debug, Clone)]
pub struct StaticProvider {
    reply: Arc<str>,
}

impl StaticProvider {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: Arc::from(reply.into()) }
    }

    pub async fn complete(&self, _content: &str) -> Result<LlmResponse, ProviderError> {
        Ok(LlmResponse {
            text: self.reply.to_string(),
            usage: None,
        })
    }
}
