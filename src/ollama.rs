//! Ollama client — the generation backend boundary
//!
//! Defines the client trait and wire types for a local Ollama instance.
//! Two implementations:
//! - `HttpOllama`: reqwest against the Ollama HTTP API (production)
//! - `MockOllama`: preconfigured responses (testing)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama endpoint.
pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// Errors from Ollama client operations.
#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    #[error("ollama not available: {0}")]
    Unavailable(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
}

/// Client trait for the generation backend.
///
/// Abstracts over transport (HTTP, mock) so the gateway and engine don't
/// depend on how Ollama is reached.
#[async_trait]
pub trait OllamaClient: Send + Sync {
    /// List model identifiers currently available on the backend.
    async fn list_models(&self) -> Result<Vec<String>, OllamaError>;

    /// Run one blocking generation request and return the raw response text.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, OllamaError>;
}

/// Match a configured model name against the available list.
///
/// Exact match wins; otherwise the first entry tagged as
/// `"{configured}:<tag>"` resolves, and its fully-qualified name should
/// replace the configured one for subsequent calls.
pub fn resolve_model(available: &[String], configured: &str) -> Option<String> {
    if available.iter().any(|m| m == configured) {
        return Some(configured.to_string());
    }
    let prefix = format!("{configured}:");
    available
        .iter()
        .find(|m| m.starts_with(&prefix))
        .cloned()
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// HTTP client for a local Ollama instance.
pub struct HttpOllama {
    host: String,
    http: reqwest::Client,
}

impl HttpOllama {
    pub fn new() -> Self {
        Self::with_host(DEFAULT_HOST)
    }

    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

impl Default for HttpOllama {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OllamaClient for HttpOllama {
    async fn list_models(&self) -> Result<Vec<String>, OllamaError> {
        let url = format!("{}/api/tags", self.host);
        let response = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?;
        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, OllamaError> {
        let url = format!("{}/api/generate", self.host);
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
        };
        let response = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(30))
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Api(format!(
                "generate returned {status}: {body}"
            )));
        }
        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.response)
    }
}

/// Mock client for testing — returns preconfigured responses.
///
/// Replies are matched by substring against the prompt, so tests key them
/// on the concept being expanded. Unmatched prompts get the fallback
/// (an empty JSON array by default).
pub struct MockOllama {
    models: Vec<String>,
    replies: Vec<(String, String)>,
    fallback: String,
    fail_transport: bool,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl MockOllama {
    /// A mock advertising the given models.
    pub fn with_models(models: &[&str]) -> Self {
        Self {
            models: models.iter().map(|m| m.to_string()).collect(),
            replies: Vec::new(),
            fallback: "[]".to_string(),
            fail_transport: false,
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A mock with no reachable backend: every call errors.
    pub fn unreachable() -> Self {
        Self {
            models: Vec::new(),
            replies: Vec::new(),
            fallback: String::new(),
            fail_transport: true,
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Register a raw response for prompts mentioning `concept`.
    pub fn with_reply(mut self, concept: impl Into<String>, raw: impl Into<String>) -> Self {
        self.replies.push((concept.into(), raw.into()));
        self
    }

    /// Override the response for prompts matching no registered concept.
    pub fn with_fallback(mut self, raw: impl Into<String>) -> Self {
        self.fallback = raw.into();
        self
    }

    /// Prompts sent through `generate`, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

#[async_trait]
impl OllamaClient for MockOllama {
    async fn list_models(&self) -> Result<Vec<String>, OllamaError> {
        if self.fail_transport {
            return Err(OllamaError::Unavailable(
                "mock configured as unreachable".to_string(),
            ));
        }
        Ok(self.models.clone())
    }

    async fn generate(&self, _model: &str, prompt: &str) -> Result<String, OllamaError> {
        if self.fail_transport {
            return Err(OllamaError::Unavailable(
                "mock configured as unreachable".to_string(),
            ));
        }
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());
        let reply = self
            .replies
            .iter()
            .find(|(concept, _)| prompt.contains(concept.as_str()))
            .map(|(_, raw)| raw.clone())
            .unwrap_or_else(|| self.fallback.clone());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_model_exact_match() {
        let available = vec!["llama3:latest".to_string(), "qwen2:7b".to_string()];
        assert_eq!(
            resolve_model(&available, "qwen2:7b").as_deref(),
            Some("qwen2:7b")
        );
    }

    #[test]
    fn resolve_model_upgrades_bare_name_to_tagged() {
        let available = vec!["gemma3:1b".to_string(), "llama3:latest".to_string()];
        assert_eq!(
            resolve_model(&available, "llama3").as_deref(),
            Some("llama3:latest")
        );
    }

    #[test]
    fn resolve_model_rejects_non_tag_prefixes() {
        // "llama3" must not match "llama30b" — only "llama3:<tag>".
        let available = vec!["llama30b".to_string()];
        assert_eq!(resolve_model(&available, "llama3"), None);
    }

    #[test]
    fn resolve_model_misses_when_absent() {
        let available = vec!["qwen2:7b".to_string()];
        assert_eq!(resolve_model(&available, "llama3"), None);
    }

    #[tokio::test]
    async fn mock_matches_reply_by_prompt_substring() {
        let client = MockOllama::with_models(&["llama3:latest"])
            .with_reply("Consciousness", r#"["Mirror Test", "Dreams"]"#);
        let raw = client
            .generate("llama3:latest", "concept: \"Consciousness\"")
            .await
            .unwrap();
        assert!(raw.contains("Mirror Test"));
    }

    #[tokio::test]
    async fn mock_falls_back_to_empty_array() {
        let client = MockOllama::with_models(&["llama3:latest"]);
        let raw = client.generate("llama3:latest", "anything").await.unwrap();
        assert_eq!(raw, "[]");
    }

    #[tokio::test]
    async fn unreachable_mock_errors_on_every_call() {
        let client = MockOllama::unreachable();
        assert!(matches!(
            client.list_models().await,
            Err(OllamaError::Unavailable(_))
        ));
        assert!(matches!(
            client.generate("llama3", "prompt").await,
            Err(OllamaError::Unavailable(_))
        ));
    }
}
