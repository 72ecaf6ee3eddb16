//! Completion service abstraction
//!
//! Provides a unified interface for the content-generation providers:
//! - OpenAI-compatible chat completion endpoints
//! - Mock client for development and testing

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trait for text completion
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for the given system and user prompts
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat completion client
pub struct OpenAICompletions {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_retries: u32,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

impl OpenAICompletions {
    /// Create a new OpenAI completion client
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            max_retries: config.max_retries,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Make request with retry
    async fn request_with_retry(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(250 * (2_u64.pow(attempt)));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(system_prompt, user_prompt).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Completion request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Generation {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Generation {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            crate::metrics::record_completion(start.elapsed().as_secs_f64(), &self.model, false);
            return Err(AppError::Generation {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: ChatResponse = response.json().await.map_err(|e| AppError::Generation {
            message: format!("Failed to parse response: {}", e),
        })?;

        crate::metrics::record_completion(start.elapsed().as_secs_f64(), &self.model, true);

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::Generation {
                message: "Empty response from completion service".to_string(),
            })
    }
}

#[async_trait]
impl CompletionClient for OpenAICompletions {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.request_with_retry(system_prompt, user_prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock completion client for development and testing
pub struct MockCompletions;

#[async_trait]
impl CompletionClient for MockCompletions {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        // Echo enough of the prompt to make output recognizable in tests
        let topic: String = user_prompt.chars().take(80).collect();
        Ok(format!(
            "Draft section generated without a live completion provider. \
            Prompt excerpt: {}",
            topic
        ))
    }

    fn model_name(&self) -> &str {
        "mock-completion"
    }
}

/// Create a completion client based on configuration
pub fn create_completion_client(config: &LlmConfig) -> Result<Arc<dyn CompletionClient>> {
    match config.provider.as_str() {
        "openai" => {
            let key = config
                .api_key
                .clone()
                .ok_or_else(|| AppError::Configuration {
                    message: "llm.api_key is required for the openai provider".to_string(),
                })?;
            Ok(Arc::new(OpenAICompletions::new(config, key)?))
        }
        "mock" => Ok(Arc::new(MockCompletions)),
        other => {
            tracing::warn!(provider = other, "Unknown completion provider, using mock");
            Ok(Arc::new(MockCompletions))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_completion() {
        let client = MockCompletions;
        let text = client
            .complete("You are a compliance writer.", "Describe the business.")
            .await
            .unwrap();
        assert!(text.contains("Describe the business."));
        assert_eq!(client.model_name(), "mock-completion");
    }

    #[test]
    fn test_factory_falls_back_to_mock() {
        let config = LlmConfig {
            provider: "unknown-provider".to_string(),
            ..crate::config::AppConfig::default().llm
        };
        let client = create_completion_client(&config).unwrap();
        assert_eq!(client.model_name(), "mock-completion");
    }

    #[test]
    fn test_openai_requires_api_key() {
        let config = crate::config::AppConfig::default().llm;
        assert!(create_completion_client(&config).is_err());
    }
}
