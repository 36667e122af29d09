//! Configuration for index building and querying.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::index::DistanceMetric;

/// Default chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default overlap between adjacent chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;
/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 4;
/// Default upload limit, 100 MB.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;
/// Default scratch directory for uploaded files.
pub const DEFAULT_SCRATCH_DIR: &str = "uploaded_docs";

/// Configuration parameters for the index builder and query pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum similarity score for results. `None` keeps everything.
    pub similarity_threshold: Option<f32>,
    /// Sampling temperature passed to the chat model.
    pub temperature: f32,
    /// Files above this size are skipped during index building.
    pub max_file_size_bytes: u64,
    /// Directory uploaded files are written to while loading.
    pub scratch_dir: PathBuf,
    /// Distance metric used by newly built indexes.
    pub metric: DistanceMetric,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            similarity_threshold: None,
            temperature: 0.0,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            metric: DistanceMetric::Cosine,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_size_bytes = bytes;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = dir.into();
        self
    }

    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.config.metric = metric;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `temperature` is outside `[0.0, 2.0]`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=2.0).contains(&self.config.temperature) {
            return Err(RagError::ConfigError(format!(
                "temperature ({}) must be within 0.0..=2.0",
                self.config.temperature
            )));
        }
        Ok(self.config)
    }
}
