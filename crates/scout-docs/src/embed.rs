use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{DocError, Result};

/// Turns text into vectors. The manager only depends on this seam, so tests
/// plug in a deterministic implementation instead of the network.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// OpenAI `/v1/embeddings` client.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        debug!(count = texts.len(), model = %self.model, "embedding texts");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "model": self.model,
                "input": texts,
            }))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "embeddings API error");
            return Err(DocError::Api {
                status,
                message: text,
            });
        }

        let api_resp: EmbeddingsResponse = resp
            .json()
            .await
            .map_err(|e| DocError::Parse(e.to_string()))?;

        // The API is documented to return entries in input order, but an
        // index field is included — honor it.
        let mut rows = api_resp.data;
        rows.sort_by_key(|d| d.index);
        Ok(rows.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}
