//! Deterministic fakes shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docqa_rag::{
    ChatModel, ChatModelConnector, EmbeddingConfig, EmbeddingProvider, IndexBuilder,
    PrefixedEmbedder, QueryPipeline, RagConfig, RagError, Result,
};

pub const DIM: usize = 256;

/// Bag-of-characters embedder over non-ASCII characters, so the ASCII role
/// prefixes do not affect ranking. Counts every call.
#[derive(Default)]
pub struct CharBagEmbedder {
    pub calls: AtomicUsize,
    pub inputs: Mutex<Vec<String>>,
}

impl CharBagEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn char_bag(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; DIM];
    vector[0] = 1.0;
    for c in text.chars().filter(|c| !c.is_ascii()) {
        vector[1 + (c as usize) % (DIM - 1)] += 1.0;
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for CharBagEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        Ok(char_bag(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Always fails, to exercise error propagation.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::EmbeddingError { provider: "fake".into(), message: "quota exceeded".into() })
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Replies with the prompt it was given.
pub struct EchoModel {
    pub temperatures: Arc<Mutex<Vec<f32>>>,
}

#[async_trait]
impl ChatModel for EchoModel {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        self.temperatures.lock().unwrap().push(temperature);
        Ok(prompt.to_string())
    }
}

#[derive(Default)]
pub struct EchoConnector {
    pub keys: Mutex<Vec<String>>,
    pub temperatures: Arc<Mutex<Vec<f32>>>,
}

impl ChatModelConnector for EchoConnector {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn ChatModel>> {
        self.keys.lock().unwrap().push(api_key.to_string());
        Ok(Arc::new(EchoModel { temperatures: Arc::clone(&self.temperatures) }))
    }
}

pub fn config_in(dir: &Path) -> RagConfig {
    RagConfig::builder().scratch_dir(dir.join("uploaded_docs")).build().unwrap()
}

pub fn embedder(provider: Arc<dyn EmbeddingProvider>) -> PrefixedEmbedder {
    PrefixedEmbedder::new(EmbeddingConfig::default(), provider)
}

pub fn builder(config: RagConfig, provider: Arc<dyn EmbeddingProvider>) -> IndexBuilder {
    IndexBuilder::new(config, embedder(provider))
}

pub fn pipeline(
    config: RagConfig,
    provider: Arc<dyn EmbeddingProvider>,
    connector: Arc<dyn ChatModelConnector>,
) -> QueryPipeline {
    QueryPipeline::builder()
        .config(config)
        .embedder(embedder(provider))
        .connector(connector)
        .build()
        .unwrap()
}
