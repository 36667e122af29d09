//! Document chunking.
//!
//! [`RecursiveChunker`] splits text on the coarsest boundary present
//! (paragraph, then line, then word) and falls back to single characters,
//! then greedily merges the pieces into chunks of at most `chunk_size`
//! characters, carrying up to `chunk_overlap` characters into the next chunk.
//!
//! Lengths are counted in `char`s, never bytes, so CJK text is cut on
//! character boundaries.

use std::collections::VecDeque;

use crate::document::{CHUNK_INDEX_KEY, Chunk, Document};

/// Paragraph, line, word, then character.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text hierarchically by a list of separators with overlap between
/// neighbouring chunks.
///
/// A separator stays attached to the start of the piece that follows it.
/// Chunk text is whitespace-trimmed and empty chunks are dropped.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(500, 100);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` with [`DEFAULT_SEPARATORS`].
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the separator hierarchy, coarsest first.
    pub fn with_separators(mut self, separators: &[&str]) -> Self {
        self.separators = separators.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Split raw text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_recursive(text, &separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // The first separator that occurs in the text wins; "" always matches.
        let mut separator = separators.last().copied().unwrap_or("");
        let mut finer: &[&str] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = candidate;
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge_pieces(&pending));
                pending.clear();
            }
            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_pieces(&pending));
        }

        chunks
    }

    /// Greedily join pieces (each shorter than `chunk_size`) into chunks,
    /// keeping a tail of at most `chunk_overlap` characters as the start of
    /// the next chunk.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_trimmed(&window) {
                    chunks.push(chunk);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(first) => total -= char_len(first),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }

        if let Some(chunk) = join_trimmed(&window) {
            chunks.push(chunk);
        }
        chunks
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        self.split_text(&document.text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let mut metadata = document.metadata.clone();
                metadata.insert(CHUNK_INDEX_KEY.to_string(), i.to_string());
                Chunk {
                    id: format!("{}_{i}", document.id),
                    text,
                    metadata,
                    document_id: document.id.clone(),
                }
            })
            .collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn join_trimmed(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

/// Split at every occurrence of `separator`, keeping the separator at the
/// start of the following piece. An empty separator splits into characters.
/// Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_stays_with_following_piece() {
        assert_eq!(split_keeping_separator("a\n\nb\n\nc", "\n\n"), vec!["a", "\n\nb", "\n\nc"]);
        assert_eq!(split_keeping_separator("\n\n\n\n", "\n\n"), vec!["\n\n", "\n\n"]);
        assert_eq!(split_keeping_separator("台北", ""), vec!["台", "北"]);
    }

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let chunker = RecursiveChunker::new(500, 100);
        assert_eq!(chunker.split_text("  台北是台灣的首都。\n"), vec!["台北是台灣的首都。"]);
    }

    #[test]
    fn text_without_separators_is_cut_by_character_with_overlap() {
        let text: String = "台".repeat(600) + &"北".repeat(600);
        let chunks = RecursiveChunker::new(500, 100).split_text(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(char_len(&chunks[0]), 500);
        assert_eq!(char_len(&chunks[1]), 500);
        assert_eq!(char_len(&chunks[2]), 400);

        let tail: String = chunks[0].chars().skip(400).collect();
        let head: String = chunks[1].chars().take(100).collect();
        assert_eq!(tail, head);
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let first = "a".repeat(300);
        let second = "b".repeat(300);
        let text = format!("{first}\n\n{second}");
        let chunks = RecursiveChunker::new(500, 100).split_text(&text);
        assert_eq!(chunks, vec![first, second]);
    }

    #[test]
    fn chunk_ids_and_metadata_follow_the_document() {
        let document = Document::from_source("notes.txt", "one\n\ntwo", "notes.txt");
        let chunks = RecursiveChunker::new(4, 1).chunk(&document);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "notes.txt_0");
        assert_eq!(chunks[1].metadata.get(CHUNK_INDEX_KEY).map(String::as_str), Some("1"));
        assert_eq!(chunks[1].source(), Some("notes.txt"));
        assert!(chunks.iter().all(|c| c.document_id == "notes.txt"));
    }

    #[test]
    fn blank_document_yields_nothing() {
        let document = Document::from_source("empty.txt", " \n\n ", "empty.txt");
        assert!(RecursiveChunker::new(500, 100).chunk(&document).is_empty());
    }
}
