//! File loaders producing [`Document`]s.
//!
//! One loader per supported extension:
//!
//! - [`PdfLoader`]: shells out to poppler's `pdftotext`, one document per page
//! - [`DocxLoader`]: reads `word/document.xml` out of the OOXML container
//! - [`TextLoader`]: UTF-8 plain text
//!
//! [`LoaderRegistry`] dispatches on the (case-insensitive) file extension.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use zip::ZipArchive;

use crate::document::{Document, PAGE_KEY};
use crate::error::{RagError, Result};

/// Extensions accepted by the default registry.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "docx"];

/// Turns a file on disk into documents.
pub trait DocumentLoader: Send + Sync {
    /// Lower-case extensions this loader handles, without the dot.
    fn extensions(&self) -> &[&'static str];

    /// Load the file at `path`. `source` is the name recorded in metadata.
    fn load(&self, path: &Path, source: &str) -> Result<Vec<Document>>;
}

fn loader_error(source: &str, message: impl Into<String>) -> RagError {
    RagError::Loader { file: source.to_string(), message: message.into() }
}

/// Reads a file as UTF-8 text. Invalid UTF-8 is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn extensions(&self) -> &[&'static str] {
        &["txt"]
    }

    fn load(&self, path: &Path, source: &str) -> Result<Vec<Document>> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| loader_error(source, format!("not valid UTF-8: {e}")))?;
        Ok(vec![Document::from_source(source, text, source)])
    }
}

/// Extracts PDF text with the `pdftotext` binary from poppler.
///
/// Pages are separated by form feeds in the output; each non-blank page
/// becomes its own document with a 1-based `page` metadata entry.
#[derive(Debug, Clone)]
pub struct PdfLoader {
    binary: String,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self { binary: "pdftotext".to_string() }
    }
}

impl PdfLoader {
    /// Use a specific `pdftotext` executable.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl DocumentLoader for PdfLoader {
    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    fn load(&self, path: &Path, source: &str) -> Result<Vec<Document>> {
        let output = Command::new(&self.binary)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| {
                loader_error(source, format!("failed to run {}: {e} (is poppler installed?)", self.binary))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(loader_error(source, format!("pdftotext failed: {}", stderr.trim())));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let documents = pdf_pages(&text, source);
        debug!(file = source, pages = documents.len(), "extracted pdf text");
        Ok(documents)
    }
}

fn pdf_pages(text: &str, source: &str) -> Vec<Document> {
    text.split('\u{c}')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| {
            let number = i + 1;
            let mut document = Document::from_source(format!("{source}#page={number}"), page, source);
            document.metadata.insert(PAGE_KEY.to_string(), number.to_string());
            document
        })
        .collect()
}

/// Extracts the text runs of a Word (`.docx`) document, one line per paragraph.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxLoader;

impl DocumentLoader for DocxLoader {
    fn extensions(&self) -> &[&'static str] {
        &["docx"]
    }

    fn load(&self, path: &Path, source: &str) -> Result<Vec<Document>> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| loader_error(source, format!("not a docx container: {e}")))?;
        let mut entry = archive
            .by_name("word/document.xml")
            .map_err(|e| loader_error(source, format!("missing word/document.xml: {e}")))?;

        let mut xml = String::new();
        entry
            .read_to_string(&mut xml)
            .map_err(|e| loader_error(source, format!("unreadable document.xml: {e}")))?;

        Ok(vec![Document::from_source(source, extract_docx_text(&xml), source)])
    }
}

static DOCX_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|</w:p>|<w:tab/>|<w:br/>")
        .expect("docx token pattern is valid")
});

/// Pull visible text out of WordprocessingML.
pub fn extract_docx_text(xml: &str) -> String {
    let mut text = String::new();
    for caps in DOCX_TOKEN.captures_iter(xml) {
        match caps.get(1) {
            Some(run) => text.push_str(&decode_xml_entities(run.as_str())),
            None => match &caps[0] {
                "<w:tab/>" => text.push('\t'),
                _ => text.push('\n'),
            },
        }
    }
    text.trim_end().to_string()
}

fn decode_xml_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Lower-cased extension of `name`, if any.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name).extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
}

/// Dispatches files to loaders by extension.
pub struct LoaderRegistry {
    loaders: Vec<Box<dyn DocumentLoader>>,
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self {
            loaders: vec![
                Box::new(PdfLoader::default()),
                Box::new(DocxLoader),
                Box::new(TextLoader),
            ],
        }
    }
}

impl LoaderRegistry {
    /// A registry with no loaders.
    pub fn empty() -> Self {
        Self { loaders: Vec::new() }
    }

    /// Register a loader. Later registrations win for a shared extension.
    pub fn with_loader(mut self, loader: Box<dyn DocumentLoader>) -> Self {
        self.loaders.insert(0, loader);
        self
    }

    /// The loader responsible for `name`, if any.
    pub fn loader_for(&self, name: &str) -> Option<&dyn DocumentLoader> {
        let extension = extension_of(name)?;
        self.loaders
            .iter()
            .find(|l| l.extensions().contains(&extension.as_str()))
            .map(|l| l.as_ref())
    }

    /// Load `path`, recording `source` as the document origin.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnsupportedFile`] when no loader handles the
    /// extension, or the loader's own error.
    pub fn load(&self, path: &Path, source: &str) -> Result<Vec<Document>> {
        let loader =
            self.loader_for(source).ok_or_else(|| RagError::UnsupportedFile(source.to_string()))?;
        loader.load(path, source)
    }
}
