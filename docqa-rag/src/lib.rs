//! Retrieval-augmented question answering over uploaded documents.
//!
//! This crate provides:
//! - Loaders for PDF, plain text and DOCX files
//! - Recursive character chunking with overlap
//! - An embedding adapter that applies document and query prefixes
//! - A persisted similarity index with integrity checks
//! - A query pipeline that answers questions from retrieved chunks
//!
//! Hosted backends are feature-gated: `huggingface` for embeddings and
//! `gemini` for answer generation.

pub mod builder;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod prompt;
pub mod storage;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "huggingface")]
pub mod huggingface;

pub use builder::{IndexBuilder, ScratchDir};
pub use chunking::{Chunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult, UploadedFile};
pub use embedding::{EmbeddingConfig, EmbeddingProvider, PrefixedEmbedder};
pub use error::{RagError, Result};
pub use index::{DistanceMetric, DocumentIndex};
pub use llm::{ChatModel, ChatModelConnector};
pub use loader::{DocumentLoader, DocxLoader, LoaderRegistry, PdfLoader, TextLoader};
pub use pipeline::{MISSING_API_KEY_ANSWER, QueryAnswer, QueryPipeline, QueryPipelineBuilder};
pub use storage::{IndexManifest, index_exists, load_index, save_index};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiChatModel, GeminiConnector};
#[cfg(feature = "huggingface")]
pub use huggingface::HuggingFaceEmbeddingProvider;
