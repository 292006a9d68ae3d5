//! OpenAI-compatible chat completion client (`/chat/completions`).
//!
//! Implements [`CompletionClient`] over `reqwest`. The wire types are
//! private to this module. The bearer credential is read from the
//! configured environment variable on every call, so a missing key is
//! reported per request rather than at startup.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use docs_portal_core::chat::{CompletionClient, CompletionError, CompletionRequest};

use crate::config::ChatConfig;

/// Client for any endpoint implementing OpenAI-style chat completions.
///
/// Cheap to clone: `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    api_url: String,
    api_key_env: String,
    app_url: String,
    app_title: String,
}

impl OpenAiCompatibleClient {
    pub fn new(config: &ChatConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key_env: config.api_key_env.clone(),
            app_url: config.app_url.clone(),
            app_title: config.app_title.clone(),
        })
    }

    fn api_key(&self) -> Result<String, CompletionError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CompletionError::MissingCredential(self.api_key_env.clone()))
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatibleClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<Option<String>, CompletionError> {
        let api_key = self.api_key()?;

        let payload = WireRequest {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.app_url)
            .header("X-Title", &self.app_title)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.api_url, error = %e, "completion request failed (transport)");
                CompletionError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "completion endpoint returned an error");
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: WireResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Decode(e.to_string()))?;
        debug!(choices = parsed.choices.len(), "received completion response");

        Ok(first_choice_text(parsed))
    }
}

fn first_choice_text(response: WireResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    #[serde(default)]
    message: Option<WireChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use docs_portal_core::models::{ChatMessage, Role};

    fn parse(json: &str) -> Option<String> {
        first_choice_text(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_first_choice_text() {
        assert_eq!(
            parse(r#"{"choices":[{"message":{"role":"assistant","content":"hi"}},{"message":{"content":"second"}}]}"#),
            Some("hi".to_string())
        );
        assert_eq!(parse(r#"{"choices":[]}"#), None);
        assert_eq!(parse(r#"{}"#), None);
        assert_eq!(parse(r#"{"choices":[{"message":{"content":null}}]}"#), None);
        assert_eq!(parse(r#"{"choices":[{}]}"#), None);
    }

    #[test]
    fn test_wire_request_shape() {
        let messages = [
            ChatMessage::new(Role::System, "sys"),
            ChatMessage::new(Role::User, "hello"),
        ];
        let payload = WireRequest {
            model: "m",
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: 1024,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
    }

    #[tokio::test]
    async fn test_missing_credential_detected_per_call() {
        let config = ChatConfig {
            api_key_env: "DOCS_PORTAL_TEST_UNSET_KEY".to_string(),
            ..ChatConfig::default()
        };
        let client = OpenAiCompatibleClient::new(&config).unwrap();
        let request = CompletionRequest {
            model: "m".into(),
            messages: vec![ChatMessage::new(Role::User, "hi")],
            max_tokens: 16,
            temperature: 0.0,
        };
        let err = client.complete(&request).await.unwrap_err();
        assert!(matches!(err, CompletionError::MissingCredential(ref name) if name == "DOCS_PORTAL_TEST_UNSET_KEY"));
    }
}
