//! Hugging Face inference embedding provider.
//!
//! This module is only available when the `huggingface` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::{DEFAULT_EMBEDDING_MODEL, EmbeddingProvider};
use crate::error::{RagError, Result};

/// Base URL of the hosted inference router.
const HF_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference/models";

/// Output width of `google/embeddinggemma-300m`.
const DEFAULT_DIMENSIONS: usize = 768;

/// An [`EmbeddingProvider`] backed by the Hugging Face feature-extraction API.
///
/// Uses `reqwest` to call the inference endpoint directly. Texts are sent as
/// given; normalization and prefixes are the adapter's job.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::huggingface::HuggingFaceEmbeddingProvider;
///
/// let provider = HuggingFaceEmbeddingProvider::new("hf_...")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct HuggingFaceEmbeddingProvider {
    client: reqwest::Client,
    token: String,
    model: String,
    base_url: String,
    dimensions: usize,
}

impl HuggingFaceEmbeddingProvider {
    /// Create a provider for the default model with the given access token.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(RagError::EmbeddingError {
                provider: "HuggingFace".into(),
                message: "access token must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            token,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            base_url: HF_INFERENCE_URL.into(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Create a provider using the `HUGGINGFACE_TOKEN` environment variable.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("HUGGINGFACE_TOKEN").map_err(|_| RagError::EmbeddingError {
            provider: "HuggingFace".into(),
            message: "HUGGINGFACE_TOKEN environment variable not set".into(),
        })?;
        Self::new(token)
    }

    /// Set the model repository id and its output dimensionality.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    /// Point at a self-hosted inference server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/pipeline/feature-extraction", self.base_url, self.model)
    }
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: Vec<&'a str>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "HuggingFace", text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: "HuggingFace".into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "HuggingFace",
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.token)
            .json(&FeatureExtractionRequest { inputs: texts.to_vec() })
            .send()
            .await
            .map_err(|e| {
                error!(provider = "HuggingFace", error = %e, "request failed");
                RagError::EmbeddingError {
                    provider: "HuggingFace".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);

            error!(provider = "HuggingFace", %status, "API error");
            return Err(RagError::EmbeddingError {
                provider: "HuggingFace".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let vectors: Vec<Vec<f32>> = response.json().await.map_err(|e| {
            error!(provider = "HuggingFace", error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: "HuggingFace".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_token() {
        assert!(matches!(
            HuggingFaceEmbeddingProvider::new("  "),
            Err(RagError::EmbeddingError { .. })
        ));
    }

    #[test]
    fn builds_feature_extraction_endpoint() {
        let provider = HuggingFaceEmbeddingProvider::new("hf_test")
            .unwrap()
            .with_base_url("http://localhost:8080/models/");
        assert_eq!(
            provider.endpoint(),
            "http://localhost:8080/models/google/embeddinggemma-300m/pipeline/feature-extraction"
        );
        assert_eq!(provider.dimensions(), 768);
    }
}
