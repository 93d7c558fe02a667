//! External reasoning client (chat-completions API)
//!
//! One request per call: no retry, bounded by the request timeout. JSON
//! requests ask the model for a `json_object` response and hand back the
//! parsed document; [`request_structured`] additionally deserializes it into
//! a typed schema and validates it before anyone uses it.

use async_trait::async_trait;
use leadwell_common::config::ReasoningSettings;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Reasoning client errors
#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ReasoningError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ReasoningError::Timeout
        } else {
            ReasoningError::Network(err.to_string())
        }
    }
}

/// Capability interface to the language model
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Ask for a JSON object and return it parsed
    async fn complete_json(&self, prompt: &str) -> Result<Value, ReasoningError>;

    /// Ask for free text
    async fn complete_text(&self, prompt: &str) -> Result<String, ReasoningError>;
}

/// A typed model answer that can check (and normalize) itself
pub trait ResponseSchema: DeserializeOwned {
    /// Reject or normalize a deserialized answer
    fn validate(self) -> Result<Self, String>;
}

/// Request JSON, deserialize into `T` and validate it
///
/// Any mismatch between the document and `T` is `MalformedResponse`.
pub async fn request_structured<T: ResponseSchema>(
    client: &dyn ReasoningClient,
    prompt: &str,
) -> Result<(T, Value), ReasoningError> {
    let document = client.complete_json(prompt).await?;
    let parsed: T = serde_json::from_value(document.clone())
        .map_err(|e| ReasoningError::MalformedResponse(e.to_string()))?;
    let validated = parsed.validate().map_err(ReasoningError::MalformedResponse)?;
    Ok((validated, document))
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client
pub struct OpenAiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(settings: &ReasoningSettings) -> Result<Self, ReasoningError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ReasoningError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, prompt: &str, json_mode: bool) -> Result<String, ReasoningError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        tracing::debug!(url = %url, model = %self.model, json_mode, "Sending chat completion request");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Api {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::MalformedResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(ReasoningError::EmptyResponse)?;

        tracing::debug!(chars = content.len(), "Chat completion received");
        Ok(content)
    }
}

#[async_trait]
impl ReasoningClient for OpenAiClient {
    async fn complete_json(&self, prompt: &str) -> Result<Value, ReasoningError> {
        let content = self.chat(prompt, true).await?;
        serde_json::from_str(&content).map_err(|e| ReasoningError::MalformedResponse(e.to_string()))
    }

    async fn complete_text(&self, prompt: &str) -> Result<String, ReasoningError> {
        self.chat(prompt, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Answer {
        value: i64,
    }

    impl ResponseSchema for Answer {
        fn validate(self) -> Result<Self, String> {
            if self.value < 0 {
                return Err("value must not be negative".to_string());
            }
            Ok(self)
        }
    }

    struct Canned(Value);

    #[async_trait]
    impl ReasoningClient for Canned {
        async fn complete_json(&self, _prompt: &str) -> Result<Value, ReasoningError> {
            Ok(self.0.clone())
        }

        async fn complete_text(&self, _prompt: &str) -> Result<String, ReasoningError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_request_structured_accepts_valid_document() {
        let client = Canned(json!({ "value": 4 }));
        let (answer, raw) = request_structured::<Answer>(&client, "p").await.unwrap();
        assert_eq!(answer.value, 4);
        assert_eq!(raw["value"], 4);
    }

    #[tokio::test]
    async fn test_request_structured_rejects_wrong_shape() {
        let client = Canned(json!({ "value": "four" }));
        let result = request_structured::<Answer>(&client, "p").await;
        assert!(matches!(result, Err(ReasoningError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_request_structured_runs_validation() {
        let client = Canned(json!({ "value": -1 }));
        let result = request_structured::<Answer>(&client, "p").await;
        match result {
            Err(ReasoningError::MalformedResponse(msg)) => assert!(msg.contains("negative")),
            other => panic!("expected malformed response, got {:?}", other.map(|(a, _)| a.value)),
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenAiClient::new(&ReasoningSettings {
            api_key: "sk-test".to_string(),
            model: "gpt-4o".to_string(),
            base_url: "http://localhost:9999/v1/".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:9999/v1");
        assert_eq!(client.model(), "gpt-4o");
    }
}
