//! Data types for uploaded files, documents, chunks, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding the originating file name.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the 1-based PDF page number.
pub const PAGE_KEY: &str = "page";
/// Metadata key holding a chunk's position within its document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// A file handed to the index builder: its name and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), content: content.into() }
    }

    /// Size of the content in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier derived from the source file (and page, for PDFs).
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document whose metadata records `source` as its origin.
    pub fn from_source(id: impl Into<String>, text: impl Into<String>, source: &str) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: HashMap::from([(SOURCE_KEY.to_string(), source.to_string())]),
        }
    }

    /// The originating file name, if recorded.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}

/// A segment of a [`Document`]'s text.
///
/// Chunks carry no embedding; the index keeps vectors alongside them,
/// one per chunk in the same position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk, `{document_id}_{chunk_index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Metadata inherited from the parent document plus `chunk_index`.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

impl Chunk {
    /// The originating file name, if recorded.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
