//! Interactive session state.
//!
//! A [`Session`] owns the currently loaded index, if any. Every operation
//! reports back with a [`Notice`] (or, for questions, the answer) instead of
//! failing, so front ends only have to print what they get.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docqa_rag::gemini::GeminiConnector;
use docqa_rag::huggingface::HuggingFaceEmbeddingProvider;
use docqa_rag::{
    ChatModelConnector, DocumentIndex, EmbeddingConfig, EmbeddingProvider, IndexBuilder,
    MISSING_API_KEY_ANSWER, PrefixedEmbedder, QueryAnswer, QueryPipeline, RagConfig, Result,
    UploadedFile, index_exists,
};
use tracing::debug;

use crate::messages::*;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self { level: Level::Success, text: text.into() }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self { level: Level::Info, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self { level: Level::Warning, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { level: Level::Error, text: text.into() }
    }

    pub fn is_success(&self) -> bool {
        self.level == Level::Success
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Read files from disk as uploads named after their final path component.
pub fn read_uploads(paths: &[PathBuf]) -> std::result::Result<Vec<UploadedFile>, Notice> {
    paths
        .iter()
        .map(|path| {
            let content = fs::read(path)
                .map_err(|e| Notice::error(format!("{ERROR_READ_FILE}{}: {e}", path.display())))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(UploadedFile::new(name, content))
        })
        .collect()
}

/// The state behind one user's build-then-ask workflow.
pub struct Session {
    settings: Settings,
    config: RagConfig,
    embedding: EmbeddingConfig,
    embedder: Option<PrefixedEmbedder>,
    connector: Arc<dyn ChatModelConnector>,
    index: Option<DocumentIndex>,
}

impl Session {
    /// Create a session with explicit backends. Without an embedding
    /// provider, indexes can still be loaded and saved but not built or
    /// queried.
    ///
    /// # Errors
    ///
    /// Returns [`docqa_rag::RagError::ConfigError`] if the settings do not
    /// form a valid configuration.
    pub fn new(
        settings: Settings,
        provider: Option<Arc<dyn EmbeddingProvider>>,
        connector: Arc<dyn ChatModelConnector>,
    ) -> Result<Self> {
        let config = settings.rag_config()?;
        let embedding = EmbeddingConfig::default();
        let embedder = provider.map(|p| PrefixedEmbedder::new(embedding.clone(), p));
        Ok(Self { settings, config, embedding, embedder, connector, index: None })
    }

    /// Create a session backed by Hugging Face embeddings and Gemini.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let provider = match settings.huggingface_token.as_deref() {
            Some(token) => {
                Some(Arc::new(HuggingFaceEmbeddingProvider::new(token)?) as Arc<dyn EmbeddingProvider>)
            }
            None => None,
        };
        Self::new(settings, provider, Arc::new(GeminiConnector::default()))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn index(&self) -> Option<&DocumentIndex> {
        self.index.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    /// Build a new index from `files`, replacing the current one on success.
    pub async fn build(&mut self, files: &[UploadedFile]) -> Notice {
        if files.is_empty() {
            return Notice::error(ERROR_NO_FILES);
        }
        let Some(embedder) = self.embedder.clone() else {
            return Notice::error(ERROR_NO_TOKEN);
        };

        match IndexBuilder::new(self.config.clone(), embedder).build(files).await {
            Ok(index) => {
                let chunk_count = index.len();
                self.index = Some(index);
                Notice::success(format!("{SUCCESS_DB_CREATED} ({chunk_count} 個文檔塊)"))
            }
            Err(e) => Notice::error(format!("{ERROR_CREATE_DB}{e}")),
        }
    }

    /// Save the current index to `dir`, or the configured index path.
    pub fn save(&self, dir: Option<&Path>) -> Notice {
        let Some(index) = &self.index else {
            return Notice::warning(WARNING_DB_NOT_READY);
        };
        let dir = dir.unwrap_or(&self.settings.index_path);
        match index.save(dir) {
            Ok(_) => Notice::success(SUCCESS_DB_SAVED),
            Err(e) => Notice::error(format!("{ERROR_SAVE_DB}{e}")),
        }
    }

    /// Load the index in `dir`, or the configured index path.
    pub fn load(&mut self, dir: Option<&Path>) -> Notice {
        let dir = dir.unwrap_or(&self.settings.index_path);
        if !index_exists(dir) {
            return Notice::info(INFO_NO_DB_FOUND);
        }
        match DocumentIndex::load(dir, &self.embedding) {
            Ok(index) => {
                self.index = Some(index);
                Notice::success(SUCCESS_DB_LOADED)
            }
            Err(e) => Notice::error(format!("{ERROR_LOAD_DB}{e}")),
        }
    }

    pub fn status(&self) -> Notice {
        match &self.index {
            Some(index) => Notice::success(format!("{INFO_DB_READY} ({} 個文檔塊)", index.len())),
            None => Notice::info(INFO_LOAD_EXISTING),
        }
    }

    /// Answer `question` from the current index.
    pub async fn ask(&self, question: &str) -> std::result::Result<QueryAnswer, Notice> {
        if question.trim().is_empty() {
            return Err(Notice::warning(ERROR_EMPTY_QUERY));
        }
        let Some(index) = &self.index else {
            return Err(Notice::info(ERROR_NO_DATABASE));
        };
        // The missing-key answer takes precedence over a missing embedding token.
        let api_key = self.settings.google_api_key.as_deref().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            return Ok(QueryAnswer {
                answer: MISSING_API_KEY_ANSWER.to_string(),
                chunks: Vec::new(),
            });
        }
        let Some(embedder) = self.embedder.clone() else {
            return Err(Notice::error(ERROR_NO_TOKEN));
        };

        debug!(question_len = question.len(), "asking");
        let pipeline = QueryPipeline::builder()
            .config(self.config.clone())
            .embedder(embedder)
            .connector(Arc::clone(&self.connector))
            .build()
            .map_err(|e| Notice::error(format!("{ERROR_QUERY}{e}")))?;

        pipeline
            .query(index, question, api_key)
            .await
            .map_err(|e| Notice::error(format!("{ERROR_QUERY}{e}")))
    }
}

/// Render an answer, optionally followed by the passages it came from.
pub fn render_answer(answer: &QueryAnswer, show_chunks: bool) -> String {
    let mut out = format!("{HEADING_ANSWER}\n{}\n", answer.answer);
    if answer.answer == MISSING_API_KEY_ANSWER {
        out.push_str(&format!("\n{WARNING_NO_API_KEY}\n"));
        return out;
    }
    if !show_chunks {
        return out;
    }

    out.push_str(&format!("\n{HEADING_CONTEXT}\n"));
    if answer.chunks.is_empty() {
        out.push_str(&format!("{WARNING_NO_DOCUMENTS}\n"));
        return out;
    }
    out.push_str(&format!("找到 {} 個相關片段：\n", answer.chunks.len()));
    for (i, result) in answer.chunks.iter().enumerate() {
        let source = result.chunk.source().unwrap_or(UNKNOWN_SOURCE);
        out.push_str(&format!(
            "\n📄 片段 {} (來自: {source}, 相似度: {:.3})\n{}\n",
            i + 1,
            result.score,
            result.chunk.text
        ));
    }
    out
}
