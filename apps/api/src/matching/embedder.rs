//! Remote sentence-embedding client and the process-wide tri-state cache
//! that decides, once, whether the embedding path is usable.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

const EMBEDDING_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible embeddings endpoint. Blank means no embedding
    /// service is configured and the TF-IDF fallback is used from the start.
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
}

/// Lifecycle of the embedding strategy. `Untried` resolves to one of the
/// other two on first use and never changes back: a known-failed setup is
/// not re-attempted for the remainder of the process.
pub enum EmbedderState {
    Untried,
    Unavailable,
    Ready(EmbeddingClient),
}

pub struct EmbeddingClient {
    http: reqwest::Client,
    config: EmbeddingConfig,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 2],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    /// Returns `None` when no endpoint is configured.
    pub fn from_config(config: &EmbeddingConfig) -> Option<Self> {
        if config.endpoint.trim().is_empty() {
            return None;
        }
        Some(Self {
            http: reqwest::Client::builder()
                .timeout(EMBEDDING_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config: config.clone(),
        })
    }

    /// Embeds both documents in one call and returns the vectors in input
    /// order.
    pub async fn embed_pair(&self, a: &str, b: &str) -> Result<(Vec<f32>, Vec<f32>)> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: [a, b],
        };

        let mut builder = self.http.post(self.config.endpoint.trim()).json(&request);
        if !self.config.api_key.trim().is_empty() {
            builder = builder.bearer_auth(self.config.api_key.trim());
        }

        let response = builder.send().await.context("embedding request failed")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("embedding endpoint returned {status}"));
        }

        let mut payload: EmbeddingResponse =
            response.json().await.context("embedding response unreadable")?;
        if payload.data.len() != 2 {
            return Err(anyhow!(
                "embedding endpoint returned {} vectors, expected 2",
                payload.data.len()
            ));
        }
        payload.data.sort_by_key(|row| row.index);

        let second = payload.data.pop().expect("length checked").embedding;
        let first = payload.data.pop().expect("length checked").embedding;
        Ok((first, second))
    }
}

/// Cosine similarity between two embedding vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_endpoint_yields_no_client() {
        let config = EmbeddingConfig {
            endpoint: "  ".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: String::new(),
        };
        assert!(EmbeddingClient::from_config(&config).is_none());
    }

    #[test]
    fn test_cosine_of_identical_vectors_is_one() {
        let v = vec![0.5_f32, 0.5, 0.1];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_handles_mismatched_or_empty_input() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
