//! Index construction from uploaded files.
//!
//! [`IndexBuilder::build`] runs the whole ingest path: write uploads to a
//! scratch directory, load them by extension, split into chunks, embed, and
//! assemble a [`DocumentIndex`]. The scratch directory is removed when the
//! build finishes, whichever way it finishes.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, UploadedFile};
use crate::embedding::PrefixedEmbedder;
use crate::error::{RagError, Result};
use crate::index::DocumentIndex;
use crate::loader::LoaderRegistry;

/// A directory that is deleted, with its contents, on drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `file` under the final component of its name. Same-named
    /// uploads overwrite each other. Returns `None` for names with no
    /// usable file component.
    pub fn write(&self, file: &UploadedFile) -> Result<Option<PathBuf>> {
        let Some(name) = Path::new(&file.name).file_name() else {
            return Ok(None);
        };
        let target = self.path.join(name);
        fs::write(&target, &file.content)?;
        Ok(Some(target))
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                warn!(path = %self.path.display(), error = %e, "failed to remove scratch directory");
            }
            _ => {}
        }
    }
}

/// Builds a [`DocumentIndex`] from uploaded files.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{IndexBuilder, RagConfig, UploadedFile};
///
/// let builder = IndexBuilder::new(RagConfig::default(), embedder);
/// let index = builder.build(&[UploadedFile::new("notes.txt", "台北是台灣的首都。")]).await?;
/// index.save("vector_db")?;
/// ```
pub struct IndexBuilder {
    config: RagConfig,
    embedder: PrefixedEmbedder,
    loaders: LoaderRegistry,
    chunker: Arc<dyn Chunker>,
}

impl IndexBuilder {
    /// Create a builder using the default loaders and a [`RecursiveChunker`]
    /// sized from `config`.
    pub fn new(config: RagConfig, embedder: PrefixedEmbedder) -> Self {
        let chunker = Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap));
        Self { config, embedder, loaders: LoaderRegistry::default(), chunker }
    }

    pub fn with_loaders(mut self, loaders: LoaderRegistry) -> Self {
        self.loaders = loaders;
        self
    }

    pub fn with_chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Load → split → embed → index.
    ///
    /// Unsupported, oversized or unreadable files are skipped with a warning.
    ///
    /// # Errors
    ///
    /// - [`RagError::NoDocuments`] if no file produced a document (including
    ///   an empty `files`); nothing is embedded in that case
    /// - [`RagError::NoChunks`] if the documents split into nothing
    /// - embedding failures, unchanged
    /// - I/O errors writing the scratch directory
    pub async fn build(&self, files: &[UploadedFile]) -> Result<DocumentIndex> {
        let scratch = ScratchDir::create(&self.config.scratch_dir)?;

        let documents = self.load_documents(&scratch, files)?;
        if documents.is_empty() {
            warn!(file_count = files.len(), "no documents extracted");
            return Err(RagError::NoDocuments);
        }

        let chunks = self.split_documents(&documents);
        if chunks.is_empty() {
            warn!(document_count = documents.len(), "splitting produced no chunks");
            return Err(RagError::NoChunks);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embedder.embed_documents(&texts).await.inspect_err(|e| {
            error!(chunk_count = texts.len(), error = %e, "embedding failed during index build");
        })?;

        let index = DocumentIndex::build(
            self.embedder.config().clone(),
            self.config.metric,
            chunks,
            vectors,
        )?;

        info!(
            file_count = files.len(),
            document_count = documents.len(),
            chunk_count = index.len(),
            dimensions = index.dimensions(),
            "built index"
        );
        Ok(index)
    }

    /// Persist each upload into `scratch` and load every supported file.
    fn load_documents(&self, scratch: &ScratchDir, files: &[UploadedFile]) -> Result<Vec<Document>> {
        let mut written: Vec<(PathBuf, &str)> = Vec::with_capacity(files.len());
        for file in files {
            if file.size() as u64 > self.config.max_file_size_bytes {
                warn!(
                    file = %file.name,
                    size = file.size(),
                    limit = self.config.max_file_size_bytes,
                    "skipping file over size limit"
                );
                continue;
            }
            match scratch.write(file)? {
                // Same-named uploads share one path; load it once.
                Some(path) if written.iter().any(|(p, _)| p == &path) => {}
                Some(path) => written.push((path, file.name.as_str())),
                None => warn!(file = %file.name, "skipping file with unusable name"),
            }
        }

        let mut documents = Vec::new();
        for (path, name) in written {
            let source = path.file_name().and_then(|n| n.to_str()).unwrap_or(name);
            match self.loaders.load(&path, source) {
                Ok(loaded) => documents.extend(loaded),
                Err(e) => warn!(file = %name, error = %e, "skipping file"),
            }
        }
        Ok(documents)
    }

    fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|d| self.chunker.chunk(d)).collect()
    }
}
