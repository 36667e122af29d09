//! Environment-driven settings.
//!
//! Values come from the process environment, after `.env` has been loaded
//! with `dotenvy`. Unset variables fall back to defaults; malformed numbers
//! are rejected.

use std::path::PathBuf;
use std::str::FromStr;

use docqa_rag::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_SCRATCH_DIR, DEFAULT_TOP_K};
use docqa_rag::embedding::DEFAULT_EMBEDDING_MODEL;
use docqa_rag::gemini::DEFAULT_CHAT_MODEL;
use docqa_rag::loader::SUPPORTED_EXTENSIONS;
use docqa_rag::{RagConfig, RagError, Result};
use serde::Serialize;

pub const ENV_HUGGINGFACE_TOKEN: &str = "HUGGINGFACE_TOKEN";
pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";

/// Where indexes are saved and loaded when no directory is given.
pub const DEFAULT_INDEX_PATH: &str = "vector_db";
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 100;

/// Runtime settings for the command-line front end.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub huggingface_token: Option<String>,
    pub google_api_key: Option<String>,
    pub llm_temperature: f32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retriever_k: usize,
    pub index_path: PathBuf,
    pub upload_dir: PathBuf,
    pub max_file_size_mb: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            huggingface_token: None,
            google_api_key: None,
            llm_temperature: 0.0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            retriever_k: DEFAULT_TOP_K,
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            upload_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] naming the variable when a numeric
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let text = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            huggingface_token: text(ENV_HUGGINGFACE_TOKEN),
            google_api_key: text(ENV_GOOGLE_API_KEY),
            llm_temperature: parse_or(&lookup, "LLM_TEMPERATURE", defaults.llm_temperature)?,
            chunk_size: parse_or(&lookup, "CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_or(&lookup, "CHUNK_OVERLAP", defaults.chunk_overlap)?,
            retriever_k: parse_or(&lookup, "RETRIEVER_K", defaults.retriever_k)?,
            index_path: text("DOCQA_INDEX_PATH").map(PathBuf::from).unwrap_or(defaults.index_path),
            upload_dir: text("TEMP_UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            max_file_size_mb: parse_or(&lookup, "MAX_FILE_SIZE_MB", defaults.max_file_size_mb)?,
        })
    }

    /// The validated library configuration these settings describe.
    pub fn rag_config(&self) -> Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.retriever_k)
            .temperature(self.llm_temperature)
            .max_file_size_bytes(self.max_file_size_mb.saturating_mul(1024 * 1024))
            .scratch_dir(self.upload_dir.clone())
            .build()
    }

    /// Names of credential variables that are not set.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.huggingface_token.is_none() {
            missing.push(ENV_HUGGINGFACE_TOKEN);
        }
        if self.google_api_key.is_none() {
            missing.push(ENV_GOOGLE_API_KEY);
        }
        missing
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            embedding_model: DEFAULT_EMBEDDING_MODEL,
            llm_model: DEFAULT_CHAT_MODEL,
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            retriever_k: self.retriever_k,
            supported_formats: SUPPORTED_EXTENSIONS.to_vec(),
            max_file_size_mb: self.max_file_size_mb,
            database_path: self.index_path.display().to_string(),
            missing_keys: self.missing_keys(),
        }
    }
}

/// Printable overview of the active configuration. Never includes credentials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSummary {
    pub embedding_model: &'static str,
    pub llm_model: &'static str,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retriever_k: usize,
    pub supported_formats: Vec<&'static str>,
    pub max_file_size_mb: u64,
    pub database_path: String,
    pub missing_keys: Vec<&'static str>,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name).map(|v| v.trim().to_string()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|e| RagError::ConfigError(format!("{name}={v:?} is not valid: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let settings = settings(&[]).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.missing_keys(), vec!["HUGGINGFACE_TOKEN", "GOOGLE_API_KEY"]);

        let config = settings.rag_config().unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.max_file_size_bytes, 100 * 1024 * 1024);
        assert_eq!(config.scratch_dir, PathBuf::from("uploaded_docs"));
    }

    #[test]
    fn reads_overrides_and_credentials() {
        let settings = settings(&[
            ("HUGGINGFACE_TOKEN", "hf_abc"),
            ("GOOGLE_API_KEY", " key "),
            ("CHUNK_SIZE", "800"),
            ("CHUNK_OVERLAP", "50"),
            ("RETRIEVER_K", "2"),
            ("LLM_TEMPERATURE", "0.3"),
            ("DOCQA_INDEX_PATH", "/tmp/db"),
            ("MAX_FILE_SIZE_MB", "5"),
        ])
        .unwrap();

        assert_eq!(settings.huggingface_token.as_deref(), Some("hf_abc"));
        assert_eq!(settings.google_api_key.as_deref(), Some("key"));
        assert!(settings.missing_keys().is_empty());
        assert_eq!(settings.index_path, PathBuf::from("/tmp/db"));

        let config = settings.rag_config().unwrap();
        assert_eq!((config.chunk_size, config.chunk_overlap, config.top_k), (800, 50, 2));
        assert_eq!(config.max_file_size_bytes, 5 * 1024 * 1024);
        assert!((config.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let settings = settings(&[("GOOGLE_API_KEY", "  "), ("CHUNK_SIZE", "")]).unwrap();
        assert_eq!(settings.google_api_key, None);
        assert_eq!(settings.chunk_size, 500);
    }

    #[test]
    fn malformed_numbers_are_config_errors() {
        let err = settings(&[("RETRIEVER_K", "four")]).unwrap_err();
        assert!(matches!(err, RagError::ConfigError(msg) if msg.contains("RETRIEVER_K")));
    }

    #[test]
    fn huge_file_size_limit_saturates() {
        let max = u64::MAX.to_string();
        let settings = settings(&[("MAX_FILE_SIZE_MB", max.as_str())]).unwrap();
        assert_eq!(settings.rag_config().unwrap().max_file_size_bytes, u64::MAX);
    }

    #[test]
    fn inconsistent_values_fail_validation() {
        let settings = settings(&[("CHUNK_SIZE", "100"), ("CHUNK_OVERLAP", "100")]).unwrap();
        assert!(settings.rag_config().is_err());
    }

    #[test]
    fn summary_serializes_without_credentials() {
        let settings = settings(&[("HUGGINGFACE_TOKEN", "hf_secret")]).unwrap();
        let json = serde_json::to_string(&settings.summary()).unwrap();
        assert!(json.contains("\"embedding_model\":\"google/embeddinggemma-300m\""));
        assert!(json.contains("\"llm_model\":\"gemini-2.5-flash\""));
        assert!(json.contains("\"database_path\":\"vector_db\""));
        assert!(json.contains("\"missing_keys\":[\"GOOGLE_API_KEY\"]"));
        assert!(!json.contains("hf_secret"));
    }
}
