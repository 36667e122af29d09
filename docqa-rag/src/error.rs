//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while building, persisting or querying an index.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The chat model call failed.
    #[error("LLM error ({provider}): {message}")]
    LlmError {
        /// The chat model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A file could not be turned into documents.
    #[error("Failed to load '{file}': {message}")]
    Loader {
        /// The file name as uploaded.
        file: String,
        /// A description of the failure.
        message: String,
    },

    /// No loader handles this file's extension.
    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    /// No documents could be extracted from the supplied files.
    #[error("未能從上傳的文件中提取任何文本。請確保文件格式正確。")]
    NoDocuments,

    /// Splitting produced no chunks.
    #[error("文本分割後沒有生成有效的文檔塊。")]
    NoChunks,

    /// An error in the similarity index.
    #[error("Index error: {0}")]
    IndexError(String),

    /// A persisted index failed verification.
    #[error("Index integrity check failed: {0}")]
    Integrity(String),

    /// The index was built with a different embedding configuration.
    #[error("Embedding configuration mismatch: index uses {found}, expected {expected}")]
    ConfigMismatch {
        /// The configuration the caller embeds queries with.
        expected: String,
        /// The configuration stored with the index.
        found: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the query pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
