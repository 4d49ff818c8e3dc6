//! Embedding Client (C2) — calls a remote OpenAI-compatible embeddings
//! endpoint, single and batched, with retry/backoff on rate limiting.
//!
//! Retry strategy:
//! - HTTP 429 → retry with exponential backoff
//! - Any other HTTP status (4xx or 5xx) → fail immediately
//! - Network error → retry
//! - Backoff: 1s, 2s, 4s (base 1s, up to 3 attempts)

use std::time::Duration;

use tracing::{error, warn};

use crate::error::CoreError;

const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const MAX_RETRIES: u32 = 3;

/// One embedding result: the vector, the reported token count, and the model used.
#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub tokens: i64,
    pub model: String,
}

pub struct EmbeddingClient {
    api_key: String,
    model: String,
    dimensions: Option<usize>,
    http: reqwest::Client,
    base_url: String,
}

impl EmbeddingClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimensions: Option<usize>) -> Self {
        EmbeddingClient {
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
            http: reqwest::Client::new(),
            base_url: EMBEDDINGS_URL.to_string(),
        }
    }

    /// Override the embeddings endpoint; used by tests to point at a local stub server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Embed a single piece of text. Rejects empty/whitespace input.
    pub async fn embed(&self, text: &str) -> Result<Embedding, CoreError> {
        if text.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "text to embed must not be empty".into(),
            ));
        }
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        Ok(batch.remove(0))
    }

    /// Embed a batch of texts, preserving input order. Empty input makes
    /// no network call and returns an empty sequence.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, CoreError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        if let Some(dims) = self.dimensions {
            body["dimensions"] = serde_json::json!(dims);
        }

        let mut last_err: Option<String> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                warn!(attempt, delay_secs = delay.as_secs(), "retrying embedding request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(&self.base_url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| CoreError::EmbeddingError(e.to_string()))?;
                        return parse_response(&json, texts.len());
                    }

                    if status.as_u16() == 429 {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(format!("embedding service error {status}: {body_text}"));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    return Err(CoreError::EmbeddingError(format!(
                        "embedding service error {status}: {body_text}"
                    )));
                }
                Err(e) => {
                    last_err = Some(e.to_string());
                    continue;
                }
            }
        }

        let message = last_err.unwrap_or_else(|| "embedding request failed after retries".into());
        error!(message, "embedding request exhausted retries");
        Err(CoreError::EmbeddingError(message))
    }
}

fn parse_response(json: &serde_json::Value, expected: usize) -> Result<Vec<Embedding>, CoreError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| CoreError::EmbeddingError("missing data array in response".into()))?;

    let total_tokens = json
        .get("usage")
        .and_then(|u| u.get("total_tokens"))
        .and_then(|t| t.as_i64())
        .unwrap_or(0);
    let tokens_each = if expected > 0 {
        total_tokens / expected as i64
    } else {
        0
    };

    let model = json
        .get("model")
        .and_then(|m| m.as_str())
        .unwrap_or_default()
        .to_string();

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let raw = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| CoreError::EmbeddingError("missing embedding array in response".into()))?;
        let vector: Vec<f32> = raw.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect();
        embeddings.push(Embedding {
            vector,
            tokens: tokens_each,
            model: model.clone(),
        });
    }
    Ok(embeddings)
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty vectors, vectors of
/// different lengths, or either vector having zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
