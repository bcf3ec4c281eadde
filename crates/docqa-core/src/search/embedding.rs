//! Embedding collaborator

use async_trait::async_trait;

use super::error::{DocQaError, DocQaResult};

/// Maps text to fixed-dimension vectors.
/// Implementations must preserve input length and order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embeddings for multiple texts
    async fn embed(&self, texts: Vec<String>) -> DocQaResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text
    async fn embed_one(&self, text: &str) -> DocQaResult<Vec<f32>> {
        self.embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DocQaError::Embedding("No embedding returned".to_string()))
    }
}

/// Check an embedder's output against what was asked of it and return the
/// shared dimension
pub fn check_embeddings(expected: usize, embeddings: &[Vec<f32>]) -> DocQaResult<usize> {
    if embeddings.len() != expected {
        return Err(DocQaError::Embedding(format!(
            "Embedding count mismatch: sent {} texts, got {} embeddings",
            expected,
            embeddings.len()
        )));
    }

    let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
        return Err(DocQaError::Embedding(format!(
            "Embedding dimension mismatch: expected {}, got {}",
            dimension,
            bad.len()
        )));
    }

    Ok(dimension)
}

#[cfg(feature = "http")]
pub use client::EmbeddingClient;

#[cfg(feature = "http")]
mod client {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use reqwest::Client;
    use serde::{Deserialize, Serialize};

    use super::Embedder;
    use crate::search::config::EmbeddingConfig;
    use crate::search::error::{DocQaError, DocQaResult};

    /// Truncation limit per input; most embedding APIs cap inputs near 8K tokens
    const MAX_CHARS: usize = 8000;

    /// OpenAI-compatible embedding API client
    pub struct EmbeddingClient {
        config: EmbeddingConfig,
        client: Client,
        /// Actual dimensions detected from API response (0 = not yet detected)
        actual_dimensions: AtomicUsize,
    }

    #[derive(Debug, Serialize)]
    struct EmbeddingRequest {
        model: String,
        input: Vec<String>,
        /// Only sent for models that support it (e.g. text-embedding-3-*)
        #[serde(skip_serializing_if = "Option::is_none")]
        dimensions: Option<usize>,
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingResponse {
        data: Vec<EmbeddingData>,
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingData {
        embedding: Vec<f32>,
        index: usize,
    }

    #[derive(Debug, Deserialize)]
    struct ErrorResponse {
        error: ErrorDetail,
    }

    #[derive(Debug, Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    impl EmbeddingClient {
        /// Create a new embedding client
        pub fn new(config: EmbeddingConfig) -> DocQaResult<Self> {
            // Validate API key is available
            config.get_api_key()?;

            let client = Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()?;

            Ok(Self {
                config,
                client,
                actual_dimensions: AtomicUsize::new(0),
            })
        }

        /// Get embedding dimensions (returns actual detected dimensions if available)
        pub fn dimensions(&self) -> usize {
            let actual = self.actual_dimensions.load(Ordering::Relaxed);
            if actual > 0 {
                actual
            } else {
                self.config.dimensions
            }
        }

        async fn embed_batch(
            &self,
            texts: Vec<String>,
            api_key: &str,
            url: &str,
        ) -> DocQaResult<Vec<Vec<f32>>> {
            let input_count = texts.len();

            let texts: Vec<String> = texts
                .into_iter()
                .map(|t| {
                    if t.chars().count() > MAX_CHARS {
                        t.chars().take(MAX_CHARS).collect()
                    } else {
                        t
                    }
                })
                .collect();

            // Other APIs may reject the dimensions parameter
            let dimensions = if self.config.model.starts_with("text-embedding-3") {
                Some(self.config.dimensions)
            } else {
                None
            };

            let request = EmbeddingRequest {
                model: self.config.model.clone(),
                input: texts,
                dimensions,
            };

            let response = self
                .client
                .post(url)
                .header("Authorization", format!("Bearer {}", api_key))
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;

            if !status.is_success() {
                if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&body) {
                    return Err(DocQaError::Embedding(error_response.error.message));
                }
                return Err(DocQaError::Embedding(format!(
                    "API error ({}): {}",
                    status, body
                )));
            }

            let response: EmbeddingResponse = serde_json::from_str(&body)
                .map_err(|e| DocQaError::Embedding(format!("Malformed response: {}", e)))?;

            if response.data.len() != input_count {
                return Err(DocQaError::Embedding(format!(
                    "Embedding count mismatch: sent {} texts, got {} embeddings",
                    input_count,
                    response.data.len()
                )));
            }

            // Sort by index to ensure correct order
            let mut data = response.data;
            data.sort_by_key(|d| d.index);

            if let Some(first) = data.first() {
                let detected_dim = first.embedding.len();
                let current = self.actual_dimensions.load(Ordering::Relaxed);
                if current == 0 {
                    self.actual_dimensions.store(detected_dim, Ordering::Relaxed);
                    log::info!("Auto-detected embedding dimensions: {}", detected_dim);
                } else if current != detected_dim {
                    return Err(DocQaError::Embedding(format!(
                        "Embedding dimension mismatch: expected {}, got {}",
                        current, detected_dim
                    )));
                }
            }

            Ok(data.into_iter().map(|d| d.embedding).collect())
        }
    }

    #[async_trait]
    impl Embedder for EmbeddingClient {
        async fn embed(&self, texts: Vec<String>) -> DocQaResult<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(vec![]);
            }

            let api_key = self.config.get_api_key()?;
            let url = format!("{}/embeddings", self.config.api_base.trim_end_matches('/'));

            let mut all_embeddings = Vec::with_capacity(texts.len());
            for batch in texts.chunks(self.config.batch_size.max(1)) {
                let batch_embeddings = self.embed_batch(batch.to_vec(), &api_key, &url).await?;
                all_embeddings.extend(batch_embeddings);
            }

            Ok(all_embeddings)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_new_with_explicit_key() {
            let config = EmbeddingConfig {
                api_key: Some("sk-test".to_string()),
                ..Default::default()
            };
            let client = EmbeddingClient::new(config).unwrap();
            assert_eq!(client.dimensions(), 1536);
        }

        #[test]
        fn test_request_omits_dimensions_for_other_models() {
            let request = EmbeddingRequest {
                model: "bge-m3".to_string(),
                input: vec!["hello".to_string()],
                dimensions: None,
            };
            let json = serde_json::to_value(&request).unwrap();
            assert!(json.get("dimensions").is_none());
        }

        #[test]
        fn test_response_parsing() {
            let body = r#"{"data":[{"embedding":[0.5,0.25],"index":1},{"embedding":[1.0,0.0],"index":0}],"usage":{"prompt_tokens":2,"total_tokens":2}}"#;
            let mut response: EmbeddingResponse = serde_json::from_str(body).unwrap();
            response.data.sort_by_key(|d| d.index);
            assert_eq!(response.data[0].embedding, vec![1.0, 0.0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, texts: Vec<String>) -> DocQaResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_embed_one_uses_batch_path() {
        let vector = LengthEmbedder.embed_one("abcd").await.unwrap();
        assert_eq!(vector, vec![4.0, 1.0]);
    }

    #[test]
    fn test_check_embeddings() {
        assert_eq!(check_embeddings(2, &[vec![0.0; 3], vec![1.0; 3]]).unwrap(), 3);
        assert!(check_embeddings(3, &[vec![0.0; 3]]).is_err());
        assert!(check_embeddings(2, &[vec![0.0; 3], vec![1.0; 2]]).is_err());
        assert_eq!(check_embeddings(0, &[]).unwrap(), 0);
    }
}
