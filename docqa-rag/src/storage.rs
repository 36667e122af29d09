//! On-disk persistence for [`DocumentIndex`].
//!
//! An index directory holds three files:
//!
//! - `manifest.json`: format version, embedding config, metric, shape and
//!   a SHA-256 of the vector file
//! - `vectors.bin`: row-major little-endian `f32` matrix
//! - `chunks.json`: chunk text and metadata, in vector order
//!
//! Loading verifies the embedding config, the checksum and the shape before
//! any vector is trusted.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::document::Chunk;
use crate::embedding::EmbeddingConfig;
use crate::error::{RagError, Result};
use crate::index::{DistanceMetric, DocumentIndex};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const VECTORS_FILE: &str = "vectors.bin";
pub const CHUNKS_FILE: &str = "chunks.json";

/// Bumped whenever the directory layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// Describes the contents of an index directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding: EmbeddingConfig,
    pub metric: DistanceMetric,
    pub dimensions: usize,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
    pub vectors_sha256: String,
}

/// Whether `dir` looks like a saved index.
pub fn index_exists(dir: impl AsRef<Path>) -> bool {
    dir.as_ref().join(MANIFEST_FILE).is_file()
}

/// Write `index` to `dir`.
///
/// `dir` must be absent, empty, or hold a previously saved index; any other
/// directory is left untouched and an [`RagError::IndexError`] is returned.
/// The files are written to a sibling staging directory first and swapped in
/// once complete, so a failed save leaves the previous index readable.
pub fn save_index(index: &DocumentIndex, dir: impl AsRef<Path>) -> Result<IndexManifest> {
    let dir = dir.as_ref();
    if !is_replaceable(dir)? {
        return Err(RagError::IndexError(format!(
            "refusing to overwrite '{}': it is not empty and holds no saved index",
            dir.display()
        )));
    }

    let staging = sibling(dir, "saving")?;
    remove_stale(&staging)?;
    fs::create_dir_all(&staging)?;
    let manifest = match write_index_files(index, &staging) {
        Ok(manifest) => manifest,
        Err(e) => {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }
    };

    if dir.exists() {
        let previous = sibling(dir, "previous")?;
        remove_stale(&previous)?;
        fs::rename(dir, &previous)?;
        if let Err(e) = fs::rename(&staging, dir) {
            let _ = fs::rename(&previous, dir);
            let _ = fs::remove_dir_all(&staging);
            return Err(e.into());
        }
        if let Err(e) = fs::remove_dir_all(&previous) {
            warn!(path = %previous.display(), error = %e, "could not remove replaced index");
        }
    } else {
        fs::rename(&staging, dir)?;
    }

    info!(path = %dir.display(), chunk_count = manifest.chunk_count, "saved index");
    Ok(manifest)
}

/// Absent, empty, or already an index.
fn is_replaceable(dir: &Path) -> Result<bool> {
    if !dir.exists() || index_exists(dir) {
        return Ok(true);
    }
    Ok(fs::read_dir(dir)?.next().is_none())
}

/// `.<name>.<suffix>` next to `dir`.
fn sibling(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = dir.file_name().ok_or_else(|| {
        RagError::IndexError(format!("'{}' does not name a directory", dir.display()))
    })?;
    Ok(dir.with_file_name(format!(".{}.{suffix}", name.to_string_lossy())))
}

/// Leftover from an interrupted save.
fn remove_stale(path: &Path) -> Result<()> {
    if path.exists() {
        warn!(path = %path.display(), "removing leftover from an interrupted save");
        fs::remove_dir_all(path)?;
    }
    Ok(())
}

fn write_index_files(index: &DocumentIndex, dir: &Path) -> Result<IndexManifest> {
    let vectors = encode_vectors(index.vectors());
    let manifest = IndexManifest {
        format_version: FORMAT_VERSION,
        embedding: index.embedding_config().clone(),
        metric: index.metric(),
        dimensions: index.dimensions(),
        chunk_count: index.len(),
        created_at: Utc::now(),
        vectors_sha256: sha256_hex(&vectors),
    };

    fs::write(dir.join(VECTORS_FILE), &vectors)?;
    fs::write(dir.join(CHUNKS_FILE), serde_json::to_vec(index.chunks())?)?;
    // Manifest last: a directory without one is never mistaken for an index.
    fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)?;
    Ok(manifest)
}

/// Read the index in `dir`, requiring it to match `expected`.
///
/// # Errors
///
/// - [`RagError::IndexError`] if `dir` holds no index or an unknown format version
/// - [`RagError::ConfigMismatch`] if it was built with another embedding config
/// - [`RagError::Integrity`] if the vector checksum or shape is wrong
pub fn load_index(dir: impl AsRef<Path>, expected: &EmbeddingConfig) -> Result<DocumentIndex> {
    let dir = dir.as_ref();
    if !index_exists(dir) {
        return Err(RagError::IndexError(format!("no saved index at '{}'", dir.display())));
    }

    let manifest: IndexManifest = serde_json::from_slice(&fs::read(dir.join(MANIFEST_FILE))?)?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(RagError::IndexError(format!(
            "unsupported index format version {} (expected {FORMAT_VERSION})",
            manifest.format_version
        )));
    }
    if &manifest.embedding != expected {
        return Err(RagError::ConfigMismatch {
            expected: expected.to_string(),
            found: manifest.embedding.to_string(),
        });
    }

    let raw = fs::read(dir.join(VECTORS_FILE))?;
    if sha256_hex(&raw) != manifest.vectors_sha256 {
        return Err(RagError::Integrity(format!("{VECTORS_FILE} checksum does not match manifest")));
    }
    let vectors = decode_vectors(&raw, manifest.dimensions, manifest.chunk_count)?;

    let chunks: Vec<Chunk> = serde_json::from_slice(&fs::read(dir.join(CHUNKS_FILE))?)?;
    if chunks.len() != manifest.chunk_count {
        return Err(RagError::Integrity(format!(
            "{CHUNKS_FILE} holds {} chunks, manifest says {}",
            chunks.len(),
            manifest.chunk_count
        )));
    }

    let index = DocumentIndex::build(manifest.embedding, manifest.metric, chunks, vectors)?;
    info!(path = %dir.display(), chunk_count = index.len(), "loaded index");
    Ok(index)
}

impl DocumentIndex {
    /// See [`save_index`].
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<IndexManifest> {
        save_index(self, dir)
    }

    /// See [`load_index`].
    pub fn load(dir: impl AsRef<Path>, expected: &EmbeddingConfig) -> Result<Self> {
        load_index(dir, expected)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn encode_vectors(vectors: &[Vec<f32>]) -> Vec<u8> {
    vectors.iter().flatten().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_vectors(raw: &[u8], dimensions: usize, count: usize) -> Result<Vec<Vec<f32>>> {
    let expected = dimensions
        .checked_mul(count)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| {
            RagError::Integrity(format!("manifest shape {count}x{dimensions} is too large"))
        })?;
    if raw.len() != expected {
        return Err(RagError::Integrity(format!(
            "{VECTORS_FILE} is {} bytes, expected {expected}",
            raw.len()
        )));
    }
    if dimensions == 0 {
        return Err(RagError::Integrity("manifest declares zero dimensions".to_string()));
    }

    let values: Vec<f32> = raw
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(values.chunks(dimensions).map(<[f32]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_encode_little_endian_row_major() {
        let raw = encode_vectors(&[vec![1.0, -2.5], vec![0.25, 8.0]]);
        assert_eq!(raw.len(), 16);
        assert_eq!(&raw[0..4], &1.0f32.to_le_bytes());
        assert_eq!(decode_vectors(&raw, 2, 2).unwrap(), vec![vec![1.0, -2.5], vec![0.25, 8.0]]);
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        let raw = encode_vectors(&[vec![1.0, 2.0, 3.0]]);
        assert!(matches!(decode_vectors(&raw, 2, 2), Err(RagError::Integrity(_))));
    }

    #[test]
    fn decode_rejects_overflowing_shape() {
        assert!(matches!(decode_vectors(&[], usize::MAX, 2), Err(RagError::Integrity(_))));
        assert!(matches!(decode_vectors(&[], 2, usize::MAX / 4), Err(RagError::Integrity(_))));
    }
}
