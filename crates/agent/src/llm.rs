//! Chat-model backed services.
//!
//! `OpenAiChatClient` speaks the OpenAI-compatible chat completions protocol,
//! which also covers local servers exposing the same API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::prompt_builder::{build_class_prompt, build_fill_prompt, build_method_prompt};
use crate::service::{ArgumentFiller, DecisionRequest, DecisionService, FillRequest, SelectionMode};

/// A model that turns a prompt into a completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> ServiceResult<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct OpenAiChatClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key_env: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenAiChatClient {
    /// Build a client; the API key is read from the configured environment
    /// variable. An empty variable name disables authentication.
    pub fn from_config(config: &LlmConfig) -> Self {
        let api_key = if config.api_key_env.is_empty() {
            None
        } else {
            std::env::var(&config.api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty())
        };
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key_env: config.api_key_env.clone(),
            api_key,
            timeout: config.timeout(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn complete(&self, prompt: &str) -> ServiceResult<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&body);
        match &self.api_key {
            Some(key) => request = request.bearer_auth(key),
            None if !self.api_key_env.is_empty() => {
                return Err(ServiceError::MissingApiKey(self.api_key_env.clone()))
            }
            None => {}
        }

        debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            prompt_len = prompt.len(),
            "Sending completion request"
        );
        let resp = request.send().await.map_err(|e| self.map_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| self.map_error(e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ServiceError::Empty)
    }
}

impl OpenAiChatClient {
    fn map_error(&self, err: reqwest::Error) -> ServiceError {
        if err.is_timeout() {
            ServiceError::Timeout(self.timeout)
        } else {
            ServiceError::from(err)
        }
    }
}

/// Decision service that prompts a chat model.
pub struct LlmDecisionService {
    model: Arc<dyn ChatModel>,
}

impl LlmDecisionService {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl DecisionService for LlmDecisionService {
    async fn decide(&self, request: &DecisionRequest<'_>) -> ServiceResult<String> {
        let prompt = match request.mode {
            SelectionMode::ClassOnly => build_class_prompt(request.query, request.catalog),
            SelectionMode::ClassMethod => build_method_prompt(request.query, request.catalog),
        };
        self.model.complete(&prompt).await
    }
}

/// Argument filler that prompts a chat model.
pub struct LlmArgumentFiller {
    model: Arc<dyn ChatModel>,
}

impl LlmArgumentFiller {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl ArgumentFiller for LlmArgumentFiller {
    async fn fill(&self, request: &FillRequest<'_>) -> ServiceResult<String> {
        let prompt = build_fill_prompt(request.query, request.pipeline);
        self.model.complete(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclass_capabilities::Catalog;
    use std::sync::Mutex;

    /// Records prompts and answers with a fixed completion.
    struct Recorder {
        prompts: Mutex<Vec<String>>,
        answer: String,
    }

    #[async_trait]
    impl ChatModel for Recorder {
        async fn complete(&self, prompt: &str) -> ServiceResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.answer.clone())
        }
    }

    #[tokio::test]
    async fn test_decision_prompt_follows_mode() {
        let recorder = Arc::new(Recorder {
            prompts: Mutex::new(Vec::new()),
            answer: "[]".to_string(),
        });
        let service = LlmDecisionService::new(recorder.clone());
        let catalog = Catalog::default();

        for mode in [SelectionMode::ClassOnly, SelectionMode::ClassMethod] {
            let answer = service
                .decide(&DecisionRequest {
                    query: "q",
                    catalog: &catalog,
                    mode,
                })
                .await
                .unwrap();
            assert_eq!(answer, "[]");
        }

        let prompts = recorder.prompts.lock().unwrap();
        assert!(prompts[0].contains("JSON array"));
        assert!(prompts[1].contains("JSON object"));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let config = LlmConfig {
            api_key_env: "AUTOCLASS_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..LlmConfig::default()
        };
        let client = OpenAiChatClient::from_config(&config);

        assert!(matches!(
            client.complete("hello").await,
            Err(ServiceError::MissingApiKey(name)) if name == "AUTOCLASS_TEST_KEY_THAT_IS_NOT_SET"
        ));
    }

    #[test]
    fn test_chat_request_shape() {
        let body = ChatRequest {
            model: "gpt-3.5-turbo",
            temperature: 0.5,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some("hi".to_string()),
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "model": "gpt-3.5-turbo",
                "temperature": 0.5,
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }
}
