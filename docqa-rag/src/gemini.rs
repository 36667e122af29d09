//! Gemini chat model over the `generateContent` REST endpoint.
//!
//! This module is only available when the `gemini` feature is enabled.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::llm::{ChatModel, ChatModelConnector};

/// Default Generative Language API base.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default model for answering questions.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";

/// A [`ChatModel`] backed by the Gemini API.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::gemini::GeminiChatModel;
///
/// let model = GeminiChatModel::new("your-api-key")?;
/// let answer = model.generate("Say hi", 0.0).await?;
/// ```
pub struct GeminiChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiChatModel {
    /// Create a client for [`DEFAULT_CHAT_MODEL`].
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::LlmError {
                provider: "Gemini".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_CHAT_MODEL.into(),
            base_url: GEMINI_BASE_URL.into(),
        })
    }

    /// Set the model name (e.g. `gemini-2.5-pro`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use a different API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Concatenate the text parts of the first candidate.
fn response_text(response: GenerateContentResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    Some(text.trim().to_string())
}

// ── ChatModel implementation ───────────────────────────────────────

#[async_trait]
impl ChatModel for GeminiChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        debug!(provider = "Gemini", model = %self.model, prompt_len = prompt.len(), "generating");

        let request_body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts: vec![RequestPart { text: prompt }] }],
            generation_config: GenerationConfig { temperature },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Gemini", error = %e, "request failed");
                RagError::LlmError { provider: "Gemini".into(), message: format!("request failed: {e}") }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = "Gemini", %status, "API error");
            return Err(RagError::LlmError {
                provider: "Gemini".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            error!(provider = "Gemini", error = %e, "failed to parse response");
            RagError::LlmError {
                provider: "Gemini".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        response_text(parsed).ok_or_else(|| RagError::LlmError {
            provider: "Gemini".into(),
            message: "response contained no candidates".into(),
        })
    }
}

/// Connects a [`GeminiChatModel`] for each supplied API key.
#[derive(Debug, Clone)]
pub struct GeminiConnector {
    model: String,
}

impl Default for GeminiConnector {
    fn default() -> Self {
        Self { model: DEFAULT_CHAT_MODEL.to_string() }
    }
}

impl GeminiConnector {
    pub fn with_model(model: impl Into<String>) -> Self {
        Self { model: model.into() }
    }
}

impl ChatModelConnector for GeminiConnector {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn ChatModel>> {
        Ok(Arc::new(GeminiChatModel::new(api_key)?.with_model(self.model.clone())))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_uses_camel_case_generation_config() {
        let body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts: vec![RequestPart { text: "hi" }] }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
                "generationConfig": {"temperature": 0.0}
            })
        );
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "台北"}, {"text": "。\n"}]}, "finishReason": "STOP"},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(response_text(response), Some("台北。".to_string()));

        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response_text(empty), None);
    }

    #[test]
    fn connector_rejects_blank_key_and_targets_model() {
        assert!(GeminiConnector::default().connect("").is_err());
        let model = GeminiChatModel::new("key").unwrap().with_base_url("http://localhost:9/v1beta/");
        assert_eq!(model.endpoint(), "http://localhost:9/v1beta/models/gemini-2.5-flash:generateContent");
    }
}
