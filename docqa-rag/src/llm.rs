//! Chat model traits used to generate answers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// A hosted language model that turns a filled prompt into text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logs.
    fn name(&self) -> &str;

    /// Generate a plain-text completion for `prompt`.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String>;
}

/// Builds a [`ChatModel`] from a caller-supplied credential.
///
/// Credentials arrive with each query and are never stored, so the pipeline
/// holds a connector rather than a ready client.
pub trait ChatModelConnector: Send + Sync {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn ChatModel>>;
}
