/// Chat-completion client over HTTP
///
/// Speaks the OpenAI-compatible `chat/completions` shape:
///
/// ```text
/// POST {api_url}
/// Authorization: Bearer {api_key}
/// {"model": ..., "messages": [{"role", "content"}...], "temperature": ..., "max_tokens": ...}
///
/// -> {"choices": [{"message": {"role": "assistant", "content": "..."}}]}
/// ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{with_system_prompt, ChatModel, LlmConfig, LlmError, TITLE_SYSTEM_PROMPT};
use crate::models::message::ChatMessage;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

pub struct HttpChatModel {
    config: LlmConfig,
    client: Client,
}

impl HttpChatModel {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn with_client(config: LlmConfig, client: Client) -> Self {
        Self { config, client }
    }

    async fn request(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let payload = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn complete(&self, transcript: &[ChatMessage]) -> Result<String, LlmError> {
        let messages = with_system_prompt(transcript);

        tracing::debug!(
            model = %self.config.model,
            turns = messages.len(),
            "Requesting chat completion"
        );

        self.request(&messages, self.config.temperature, self.config.max_tokens)
            .await
    }

    async fn generate_title(&self, first_message: &str) -> Result<String, LlmError> {
        let messages = [
            ChatMessage::system(TITLE_SYSTEM_PROMPT),
            ChatMessage::user(first_message),
        ];

        self.request(
            &messages,
            self.config.title_temperature,
            self.config.title_max_tokens,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_payload_shape() {
        let messages = with_system_prompt(&[ChatMessage::user("hi")]);
        let payload = CompletionRequest {
            model: "mistral-small-latest",
            messages: &messages,
            temperature: 0.5,
            max_tokens: 64,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["model"], "mistral-small-latest");
        assert_eq!(json["max_tokens"], 64);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_response_decoding() {
        let body = r#"{
            "id": "cmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello!"}}],
            "usage": {"total_tokens": 12}
        }"#;

        let response: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices[0].message.content, "Hello!");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let config = LlmConfig {
            api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            ..LlmConfig::default()
        };
        let model = HttpChatModel::new(config).unwrap();

        let result = model.complete(&[ChatMessage::user("hi")]).await;
        assert!(matches!(result, Err(LlmError::Transport(_))));
    }
}
