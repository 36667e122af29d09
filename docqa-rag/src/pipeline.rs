//! Question answering over a built [`DocumentIndex`].
//!
//! The [`QueryPipeline`] embeds the question with the query prefix, retrieves
//! the closest chunks once, fills the answer prompt with them and asks a
//! [`ChatModel`] for the answer.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{GeminiConnector, QueryPipeline, RagConfig};
//!
//! let pipeline = QueryPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedder(embedder)
//!     .connector(Arc::new(GeminiConnector::default()))
//!     .build()?;
//!
//! let answer = pipeline.query(&index, "台灣的首都是哪裡？", Some(&api_key)).await?;
//! println!("{}", answer.answer);
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::config::RagConfig;
use crate::document::SearchResult;
use crate::embedding::PrefixedEmbedder;
use crate::error::{RagError, Result};
use crate::index::DocumentIndex;
use crate::llm::ChatModelConnector;
use crate::prompt::{build_prompt, format_context};

/// Answer returned when no chat model credential is supplied.
pub const MISSING_API_KEY_ANSWER: &str = "錯誤：未提供 Google API Key。";

/// The generated answer and the chunks it was generated from, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAnswer {
    pub answer: String,
    pub chunks: Vec<SearchResult>,
}

/// The question answering pipeline.
///
/// Construct one via [`QueryPipeline::builder()`].
pub struct QueryPipeline {
    config: RagConfig,
    embedder: PrefixedEmbedder,
    connector: Arc<dyn ChatModelConnector>,
}

impl QueryPipeline {
    /// Create a new [`QueryPipelineBuilder`].
    pub fn builder() -> QueryPipelineBuilder {
        QueryPipelineBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn embedder(&self) -> &PrefixedEmbedder {
        &self.embedder
    }

    /// Retrieve the chunks closest to `question`, filtered by the configured
    /// similarity threshold.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigMismatch`] if `index` was built with a different
    ///   embedding configuration
    /// - embedding failures, unchanged
    pub async fn retrieve(&self, index: &DocumentIndex, question: &str) -> Result<Vec<SearchResult>> {
        index.ensure_compatible(self.embedder.config())?;

        let query_vector = self.embedder.embed_query(question).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during query");
        })?;
        let results = index.search(&query_vector, self.config.top_k)?;

        Ok(match self.config.similarity_threshold {
            Some(threshold) => results.into_iter().filter(|r| r.score >= threshold).collect(),
            None => results,
        })
    }

    /// Answer `question` from the chunks of `index`.
    ///
    /// A missing or blank `llm_api_key` is not an error: the answer is
    /// [`MISSING_API_KEY_ANSWER`] with no chunks, and nothing is embedded.
    ///
    /// # Errors
    ///
    /// - [`RagError::PipelineError`] if `question` is blank
    /// - anything [`retrieve`](Self::retrieve) returns
    /// - [`RagError::LlmError`] if the chat model fails
    pub async fn query(
        &self,
        index: &DocumentIndex,
        question: &str,
        llm_api_key: Option<&str>,
    ) -> Result<QueryAnswer> {
        if question.trim().is_empty() {
            return Err(RagError::PipelineError("question must not be empty".to_string()));
        }
        let api_key = match llm_api_key.map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => {
                info!("no chat model API key supplied");
                return Ok(QueryAnswer {
                    answer: MISSING_API_KEY_ANSWER.to_string(),
                    chunks: Vec::new(),
                });
            }
        };

        let chunks = self.retrieve(index, question).await?;
        let prompt = build_prompt(&format_context(&chunks), question);

        let model = self.connector.connect(api_key)?;
        let answer = model.generate(&prompt, self.config.temperature).await.inspect_err(|e| {
            error!(model = model.name(), error = %e, "answer generation failed");
        })?;

        info!(
            model = model.name(),
            chunk_count = chunks.len(),
            answer_len = answer.len(),
            "query completed"
        );
        Ok(QueryAnswer { answer, chunks })
    }
}

/// Builder for constructing a [`QueryPipeline`].
///
/// `embedder` and `connector` are required; `config` defaults to
/// [`RagConfig::default()`].
#[derive(Default)]
pub struct QueryPipelineBuilder {
    config: Option<RagConfig>,
    embedder: Option<PrefixedEmbedder>,
    connector: Option<Arc<dyn ChatModelConnector>>,
}

impl QueryPipelineBuilder {
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedder. Must match the one the index was built with.
    pub fn embedder(mut self, embedder: PrefixedEmbedder) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set how chat models are created from per-query credentials.
    pub fn connector(mut self, connector: Arc<dyn ChatModelConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Build the [`QueryPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing.
    pub fn build(self) -> Result<QueryPipeline> {
        let embedder = self
            .embedder
            .ok_or_else(|| RagError::ConfigError("embedder is required".to_string()))?;
        let connector = self
            .connector
            .ok_or_else(|| RagError::ConfigError("connector is required".to_string()))?;

        Ok(QueryPipeline { config: self.config.unwrap_or_default(), embedder, connector })
    }
}
