//! OpenRouter API client for vision chat completions.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::LlmSettings;
use crate::error::ExtractionError;

const MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.1;

/// OpenRouter client for chat completions.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl OpenRouterClient {
    /// Build a client whose every request is bounded by the configured timeout.
    pub fn new(settings: &LlmSettings) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ExtractionError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            endpoint: settings.endpoint.clone(),
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat completion request and return the first choice's text.
    pub async fn chat(&self, messages: Vec<Message>) -> Result<String, ExtractionError> {
        let api_key = self.api_key.as_deref().ok_or(ExtractionError::MissingCredential)?;

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
        };

        debug!("Sending request to OpenRouter: model={}", request.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("X-Title", "Receipt Extractor")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await?;
        let response: ChatCompletionResponse = serde_json::from_str(&raw).map_err(|e| {
            ExtractionError::MalformedResponse(format!(
                "{}: {}",
                e,
                raw.chars().take(200).collect::<String>()
            ))
        })?;

        if let Some(usage) = &response.usage {
            info!(
                "OpenRouter response: {} tokens (prompt: {}, completion: {})",
                usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
            );
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ExtractionError::MalformedResponse("no choices in response".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// ============================================================================
// Message types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl Message {
    /// Create a user message with text and one base64-encoded image.
    pub fn user_with_image(text: impl Into<String>, mime: &str, image: &[u8]) -> Self {
        let data_url = format!("data:{};base64,{}", mime, BASE64.encode(image));

        Self {
            role: Role::User,
            content: vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: data_url },
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_message_shape() {
        let msg = Message::user_with_image("read this", "image/jpeg", b"abc");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "read this");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(json["content"][1]["image_url"]["url"], "data:image/jpeg;base64,YWJj");
    }

    #[tokio::test]
    async fn test_missing_key_short_circuits() {
        let client = OpenRouterClient::new(&LlmSettings::default()).unwrap();
        assert!(!client.has_credential());
        let err = client.chat(vec![]).await.unwrap_err();
        assert!(matches!(err, ExtractionError::MissingCredential));
    }
}
