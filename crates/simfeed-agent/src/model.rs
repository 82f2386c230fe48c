// ABOUTME: Model client trait plus the DeepSeek chat-completions adapter.
// ABOUTME: Sends the full transcript each call and returns the raw assistant text for the dispatcher to parse.

use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;

use simfeed_core::{Message, Transcript};

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
const DEFAULT_MODEL: &str = "deepseek-chat";
const MAX_TOKENS: u32 = 4096;

/// Transport and provider failures. These abort the turn that triggered them;
/// malformed model OUTPUT is not an error here, the dispatcher handles that
/// as part of the protocol.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A chat model the dispatcher can drive. The whole transcript goes out on
/// every call; the client holds no conversation state of its own.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, transcript: &Transcript) -> Result<String, ModelError>;
}

/// DeepSeek adapter. Speaks the OpenAI-compatible Chat Completions API and
/// asks for a JSON object response so the assistant text parses as a tool call.
pub struct DeepSeekClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl DeepSeekClient {
    /// Create a client reading configuration from environment variables.
    /// Required: `DEEPSEEK_API_KEY`
    /// Optional: `DEEPSEEK_BASE_URL` (defaults to https://api.deepseek.com)
    /// Optional: `DEEPSEEK_MODEL` (defaults to deepseek-chat)
    pub fn from_env() -> Result<Self, ModelError> {
        let api_key = std::env::var("DEEPSEEK_API_KEY")
            .map_err(|_| ModelError::Provider("DEEPSEEK_API_KEY not set".to_string()))?;

        let base_url =
            std::env::var("DEEPSEEK_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let model = std::env::var("DEEPSEEK_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self::new(api_key, base_url, model))
    }

    /// Create a client with explicit configuration.
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Build the JSON request body for the Chat Completions API.
    pub fn build_request_body(&self, transcript: &Transcript) -> Value {
        let messages: Vec<Value> = transcript.messages().iter().map(wire_message).collect();

        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": messages,
            "response_format": response_format(),
        })
    }

    /// Pull the assistant text out of a Chat Completions response.
    pub fn parse_response(response_body: &Value) -> Result<String, ModelError> {
        let choices = response_body
            .get("choices")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                ModelError::InvalidResponse("missing choices array in response".to_string())
            })?;

        let choice = choices
            .first()
            .ok_or_else(|| ModelError::InvalidResponse("empty choices array".to_string()))?;

        let content = choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                ModelError::InvalidResponse("missing message content in choice".to_string())
            })?;

        Ok(content.to_string())
    }
}

/// The structured-output contract: every reply must be a single tool call
/// with its reasoning. The dispatcher still treats the reply as untrusted.
fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "tool_response",
            "description": "Response containing tool selection and reasoning",
            "schema": {
                "type": "object",
                "properties": {
                    "function_name": {
                        "type": "string",
                        "description": "Name of the function to call"
                    },
                    "arguments": {
                        "type": "array",
                        "description": "List of argument values in order of function parameters",
                        "items": {}
                    },
                    "reasoning": {
                        "type": "string",
                        "description": "Short description of why this tool was chosen"
                    }
                },
                "required": ["function_name", "arguments", "reasoning"],
                "additionalProperties": false
            }
        }
    })
}

fn wire_message(message: &Message) -> Value {
    json!({
        "role": message.role,
        "content": message.content,
    })
}

#[async_trait]
impl ModelClient for DeepSeekClient {
    async fn complete(&self, transcript: &Transcript) -> Result<String, ModelError> {
        let body = self.build_request_body(transcript);
        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Provider(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ModelError::RateLimited);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ModelError::Provider(
                "Unauthorized: check DEEPSEEK_API_KEY".to_string(),
            ));
        }

        if status.is_server_error() {
            return Err(ModelError::Provider(format!("Server error: {}", status)));
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ModelError::Provider(format!(
                "API error {}: {}",
                status, error_body
            )));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("failed to parse JSON: {}", e)))?;

        Self::parse_response(&response_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simfeed_core::Message;

    fn client() -> DeepSeekClient {
        DeepSeekClient::new(
            "test-key".to_string(),
            "https://api.deepseek.com".to_string(),
            "deepseek-chat".to_string(),
        )
    }

    #[test]
    fn builds_request_body_with_full_transcript() {
        let transcript = Transcript::seeded(Message::system("you are a persona"));
        let body = client().build_request_body(&transcript);

        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["response_format"]["type"], "json_schema");
        let required = &body["response_format"]["json_schema"]["schema"]["required"];
        assert_eq!(
            required,
            &json!(["function_name", "arguments", "reasoning"])
        );

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "you are a persona");
    }

    #[test]
    fn request_body_preserves_message_order() {
        let mut transcript = Transcript::seeded(Message::system("seed"));
        transcript.push(Message::assistant("{\"function_name\": \"create_post\"}"));
        transcript.push(Message::user("{\"status\": \"ok\"}"));

        let body = client().build_request_body(&transcript);
        let messages = body["messages"].as_array().unwrap();
        let roles: Vec<&str> = messages
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, ["system", "assistant", "user"]);
    }

    #[test]
    fn parses_assistant_content() {
        let response = json!({
            "id": "chatcmpl-123",
            "choices": [
                {
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": "{\"function_name\": \"view_most_recent_posts\"}"
                    },
                    "finish_reason": "stop"
                }
            ]
        });

        let content = DeepSeekClient::parse_response(&response).unwrap();
        assert!(content.contains("view_most_recent_posts"));
    }

    #[test]
    fn missing_choices_is_invalid_response() {
        let err = DeepSeekClient::parse_response(&json!({"id": "x"})).unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
        assert!(err.to_string().contains("choices"));
    }

    #[test]
    fn null_content_is_invalid_response() {
        let response = json!({
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": null } }
            ]
        });
        let err = DeepSeekClient::parse_response(&response).unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
    }
}
