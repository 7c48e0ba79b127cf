//! Text → vector embedders.
//!
//! `Embedder` is an enum over concrete backends, dispatched like
//! [`LlmProvider`](crate::llm::LlmProvider):
//!
//! - `Hashing`: deterministic feature hashing of word tokens. Offline, no
//!   model weights. Embeds a document's compact `key`, not its summary.
//! - `OpenAiCompatible`: any `/v1/embeddings` endpoint (OpenAI, Ollama…).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error};

use crate::config::EmbeddingConfig;
use crate::error::AppError;
use crate::http;
use crate::index::IndexDocument;

#[derive(Debug, Clone)]
pub enum Embedder {
    Hashing(HashingEmbedder),
    OpenAiCompatible(OpenAiEmbedder),
}

impl Embedder {
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        match self {
            Embedder::Hashing(e) => Ok(e.embed(text)),
            Embedder::OpenAiCompatible(e) => e.embed(text).await,
        }
    }

    /// The part of `document` this embedder turns into the stored vector.
    pub fn document_text<'a>(&self, document: &'a IndexDocument) -> &'a str {
        match self {
            // Hashed term counts only reach useful cosine scores on short text.
            Embedder::Hashing(_) => &document.key,
            Embedder::OpenAiCompatible(_) => &document.body,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Embedder::Hashing(_) => "hashing",
            Embedder::OpenAiCompatible(_) => "openai",
        }
    }
}

/// Construct the configured embedder. `api_key` comes from the environment.
pub fn build(config: &EmbeddingConfig, api_key: Option<String>) -> Result<Embedder, AppError> {
    match config.provider.as_str() {
        "hashing" => Ok(Embedder::Hashing(HashingEmbedder::new(config.hashing_dimensions))),
        "openai" | "openai-compatible" => {
            let oai = &config.openai;
            Ok(Embedder::OpenAiCompatible(OpenAiEmbedder::new(
                oai.api_base_url.clone(),
                oai.model.clone(),
                oai.timeout_seconds,
                api_key,
            )?))
        }
        other => Err(AppError::Config(format!("unknown embedding provider: {other}"))),
    }
}

// ── Hashing ───────────────────────────────────────────────────────────────────

/// Signed feature hashing over lowercase alphanumeric tokens, L2-normalised.
///
/// Identical text always yields an identical vector. Empty text yields the
/// zero vector, which scores 0 against everything.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokens(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            let h = u64::from_le_bytes(head);
            let bucket = (h % self.dimensions as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

// ── OpenAI-compatible ─────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing `/v1/embeddings`.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    api_base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiEmbedder {
    pub fn new(
        api_base_url: String,
        model: String,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, AppError> {
        let client = http::client(timeout_seconds).map_err(AppError::Embedding)?;
        Ok(Self { client, api_base_url, model, api_key })
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let payload = EmbeddingRequest { model: &self.model, input: text };
        debug!(model = %self.model, input_len = text.len(), "sending embedding request");

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, "embedding request failed (transport)");
            AppError::Embedding(e.to_string())
        })?;

        let response = http::success_or_message(response).await.map_err(|message| {
            error!(%message, "embedding request returned HTTP error");
            AppError::Embedding(message)
        })?;

        let parsed = response.json::<EmbeddingResponse>().await.map_err(|e| {
            AppError::Embedding(format!("failed to parse embedding response: {e}"))
        })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Embedding("empty or missing embedding in response".into()))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiEmbeddingConfig;
    use crate::index::cosine_similarity;

    #[test]
    fn hashing_is_deterministic_and_normalised() {
        let e = HashingEmbedder::new(64);
        let a = e.embed("Wireless Mouse, Electronics");
        let b = e.embed("wireless mouse electronics");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hashing_empty_text_is_zero_vector() {
        let e = HashingEmbedder::new(16);
        assert!(e.embed("  ,, ").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn hashing_overlap_scores_higher() {
        let e = HashingEmbedder::new(512);
        let q = e.embed("wireless mouse");
        let close = e.embed("wireless mouse with usb receiver");
        let far = e.embed("ceramic coffee mug");
        assert!(cosine_similarity(&q, &close) > cosine_similarity(&q, &far));
    }

    #[test]
    fn hashing_embeds_key_and_remote_embeds_body() {
        let doc = IndexDocument::new("Name: Wireless Mouse\nPrice: 19.99\n", Default::default())
            .with_key("wireless mouse");
        let hashing = Embedder::Hashing(HashingEmbedder::new(8));
        assert_eq!(hashing.document_text(&doc), "wireless mouse");

        let remote = Embedder::OpenAiCompatible(
            OpenAiEmbedder::new("http://127.0.0.1:9/v1/embeddings".into(), "m".into(), 1, None)
                .unwrap(),
        );
        assert_eq!(remote.document_text(&doc), doc.body);
    }

    #[test]
    fn build_rejects_unknown_provider() {
        let cfg = EmbeddingConfig {
            provider: "word2vec".into(),
            hashing_dimensions: 8,
            openai: OpenAiEmbeddingConfig {
                api_base_url: "http://localhost:0/v1/embeddings".into(),
                model: "m".into(),
                timeout_seconds: 1,
            },
        };
        assert!(build(&cfg, None).is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_embedding_error() {
        let e = OpenAiEmbedder::new("http://127.0.0.1:9/v1/embeddings".into(), "m".into(), 2, None)
            .unwrap();
        assert!(matches!(e.embed("x").await, Err(AppError::Embedding(_))));
    }
}
