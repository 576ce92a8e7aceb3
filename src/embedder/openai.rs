/// Embedding provider backed by the OpenAI `/embeddings` HTTP API.
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Embedder, EmbedderError};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_DIMENSIONS: usize = 1536;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    encoding_format: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

pub struct OpenAiEmbedder {
    client: reqwest::blocking::Client,
    api_key: String,
    api_base: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Build a client for `model`, expected to return `dimensions`-long vectors.
    pub fn new(
        api_key: &str,
        api_base: &str,
        model: &str,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self, EmbedderError> {
        if api_key.trim().is_empty() {
            return Err(EmbedderError::MissingApiKey);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("code-indexer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EmbedderError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn fetch(&self, texts: &[&str]) -> Result<EmbeddingResponse, EmbedderError> {
        let url = format!("{}/embeddings", self.api_base);
        debug!("POST {url} ({} inputs)", texts.len());

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
                encoding_format: "float",
            })
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    EmbedderError::Request(format!("request timed out: {e}"))
                } else {
                    EmbedderError::Request(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(EmbedderError::Request(format!("API returned {status}: {body}")));
        }

        resp.json()
            .map_err(|e| EmbedderError::Response(e.to_string()))
    }
}

/// Order response items by their `index` and check count and dimensionality.
fn into_vectors(
    mut response: EmbeddingResponse,
    expected_count: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>, EmbedderError> {
    if response.data.len() != expected_count {
        return Err(EmbedderError::Response(format!(
            "expected {expected_count} embeddings, got {}",
            response.data.len()
        )));
    }
    response.data.sort_by_key(|d| d.index);

    response
        .data
        .into_iter()
        .map(|d| {
            if d.embedding.len() == dimensions {
                Ok(d.embedding)
            } else {
                Err(EmbedderError::DimensionMismatch {
                    expected: dimensions,
                    actual: d.embedding.len(),
                })
            }
        })
        .collect()
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| EmbedderError::Response("empty data array".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let response = self.fetch(texts)?;
        into_vectors(response, texts.len(), self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
