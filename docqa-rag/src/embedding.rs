//! Embedding provider trait and the prefixing adapter in front of it.
//!
//! The embedding model is tuned asymmetrically: stored passages and search
//! queries get different prefixes before they are embedded. [`EmbeddingConfig`]
//! owns those conventions as plain data, [`PrefixedEmbedder`] applies them
//! around any [`EmbeddingProvider`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RagError, Result};

/// Model used when nothing else is configured.
pub const DEFAULT_EMBEDDING_MODEL: &str = "google/embeddinggemma-300m";
/// Prefix template for stored passages. `{text}` is replaced by the content.
pub const DOCUMENT_PREFIX: &str = "title: none | text: {text}";
/// Prefix template for search queries. `{text}` is replaced by the content.
pub const QUERY_PREFIX: &str = "task: search result | query: {text}";

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially;
/// backends that support native batching should override it.
///
/// Providers see text exactly as given. Role prefixes are applied by
/// [`PrefixedEmbedder`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// The embedding conventions an index is built with.
///
/// Two indexes are only comparable when their configs are equal, so the
/// config is persisted with every index and checked on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Identity of the embedding model.
    pub model_id: String,
    /// Template applied to passages, containing `{text}`.
    pub document_prefix: String,
    /// Template applied to queries, containing `{text}`.
    pub query_prefix: String,
    /// Whether vectors are L2-normalized after embedding.
    pub normalize: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_EMBEDDING_MODEL.to_string(),
            document_prefix: DOCUMENT_PREFIX.to_string(),
            query_prefix: QUERY_PREFIX.to_string(),
            normalize: true,
        }
    }
}

impl EmbeddingConfig {
    /// Text sent to the provider when embedding a passage.
    pub fn format_document(&self, text: &str) -> String {
        self.document_prefix.replace("{text}", text)
    }

    /// Text sent to the provider when embedding a query.
    pub fn format_query(&self, text: &str) -> String {
        self.query_prefix.replace("{text}", text)
    }
}

impl fmt::Display for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (document: {:?}, query: {:?}, normalize: {})",
            self.model_id, self.document_prefix, self.query_prefix, self.normalize
        )
    }
}

/// Scale `vector` to unit L2 length in place. A zero vector is left as is.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Applies an [`EmbeddingConfig`] around an [`EmbeddingProvider`].
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use docqa_rag::{EmbeddingConfig, PrefixedEmbedder};
///
/// let embedder = PrefixedEmbedder::new(EmbeddingConfig::default(), Arc::new(provider));
/// let vectors = embedder.embed_documents(&["台北是台灣的首都。"]).await?;
/// let query = embedder.embed_query("台灣的首都是哪裡？").await?;
/// ```
#[derive(Clone)]
pub struct PrefixedEmbedder {
    config: EmbeddingConfig,
    provider: Arc<dyn EmbeddingProvider>,
}

impl PrefixedEmbedder {
    pub fn new(config: EmbeddingConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed passages, one vector per input, in input order.
    ///
    /// # Errors
    ///
    /// Propagates provider failures unchanged. Returns
    /// [`RagError::EmbeddingError`] if the provider returns a different
    /// number of vectors than inputs.
    pub async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let prefixed: Vec<String> = texts.iter().map(|t| self.config.format_document(t)).collect();
        let refs: Vec<&str> = prefixed.iter().map(String::as_str).collect();

        debug!(model = %self.config.model_id, batch_size = refs.len(), "embedding documents");
        let mut vectors = self.provider.embed_batch(&refs).await?;
        if vectors.len() != texts.len() {
            return Err(RagError::EmbeddingError {
                provider: self.config.model_id.clone(),
                message: format!("expected {} vectors, got {}", texts.len(), vectors.len()),
            });
        }
        if self.config.normalize {
            vectors.iter_mut().for_each(|v| l2_normalize(v));
        }
        Ok(vectors)
    }

    /// Embed a search query.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let prefixed = self.config.format_query(text);
        debug!(model = %self.config.model_id, text_len = text.len(), "embedding query");
        let mut vector = self.provider.embed(&prefixed).await?;
        if self.config.normalize {
            l2_normalize(&mut vector);
        }
        Ok(vector)
    }
}

impl fmt::Debug for PrefixedEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefixedEmbedder")
            .field("config", &self.config)
            .field("dimensions", &self.provider.dimensions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingProvider {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmbeddingProvider for RecordingProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(vec![3.0, 4.0])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    #[test]
    fn formats_documents_and_queries_differently() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.format_document("abc"), "title: none | text: abc");
        assert_eq!(config.format_query("abc"), "task: search result | query: abc");
    }

    #[test]
    fn normalizes_to_unit_length_and_keeps_zero_vectors() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn same_text_reaches_provider_with_role_prefix() {
        let provider = Arc::new(RecordingProvider::default());
        let embedder = PrefixedEmbedder::new(EmbeddingConfig::default(), provider.clone());

        let docs = embedder.embed_documents(&["台北"]).await.unwrap();
        let query = embedder.embed_query("台北").await.unwrap();

        let seen = provider.seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["title: none | text: 台北", "task: search result | query: 台北"]);
        assert_ne!(seen[0], seen[1]);
        assert!((docs[0][0] - 0.6).abs() < 1e-6);
        assert!((query[1] - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn skips_normalization_when_disabled() {
        let config = EmbeddingConfig { normalize: false, ..EmbeddingConfig::default() };
        let embedder = PrefixedEmbedder::new(config, Arc::new(RecordingProvider::default()));
        assert_eq!(embedder.embed_query("q").await.unwrap(), vec![3.0, 4.0]);
    }
}
