//! Grok (x.ai) adapter. Text only.
//!
//! OpenAI-shaped chat schema on a different base URL; bearer auth.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{ApiError, ErrorCode, Provider, TextResult};
use tracing::debug;

use crate::adapter::ProviderAdapter;
use crate::http;

const DEFAULT_BASE: &str = "https://api.x.ai";
const MODEL: &str = "grok-beta";
const SYSTEM_PROMPT: &str = "Você é um especialista em copywriting brasileiro.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    model: &'a str,
    stream: bool,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct GrokAdapter {
    http: Client,
    probe: Client,
    base: String,
}

impl GrokAdapter {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base: impl Into<String>) -> Self {
        Self {
            http: http::generation_client(),
            probe: http::probe_client(),
            base: base.into(),
        }
    }
}

impl Default for GrokAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for GrokAdapter {
    fn provider(&self) -> Provider {
        Provider::Grok
    }

    async fn generate_text(&self, prompt: &str, api_key: &str) -> Result<TextResult, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base);
        let req = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            model: MODEL,
            stream: false,
            temperature: 0.7,
            max_tokens: None,
        };

        debug!(provider = "grok", "text generation request");
        let resp = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(Provider::Grok, &e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::from_status(Provider::Grok, status, &body));
        }

        let body: ChatResponse = resp.json().await.map_err(|e| {
            ApiError::new(
                ErrorCode::HttpError,
                Provider::Grok,
                format!("resposta inesperada: {}", e),
            )
        })?;

        let content = body
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        Ok(TextResult {
            content,
            provider: Provider::Grok,
            tokens_used: None,
        })
    }

    async fn validate_key(&self, api_key: &str) -> Result<bool, ApiError> {
        // Minimal probe; 400 means the request body was rejected by an
        // authenticated key.
        let url = format!("{}/v1/chat/completions", self.base);
        let req = ChatRequest {
            messages: vec![ChatMessage {
                role: "user",
                content: "oi",
            }],
            model: MODEL,
            stream: false,
            temperature: 0.0,
            max_tokens: Some(1),
        };

        let resp = self
            .probe
            .post(url)
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(Provider::Grok, &e))?;

        let status = resp.status();
        match status.as_u16() {
            200..=299 | 400 => Ok(true),
            401 | 403 => Ok(false),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                Err(ApiError::from_status(Provider::Grok, status, &body))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn text_generation_uses_bearer_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer xai-test")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"Promoção relâmpago!"}}]}"#)
            .create_async()
            .await;

        let adapter = GrokAdapter::with_base_url(server.url());
        let result = adapter.generate_text("tênis de corrida", "xai-test").await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.content, "Promoção relâmpago!");
        assert_eq!(result.provider, Provider::Grok);
    }

    #[tokio::test]
    async fn probe_accepts_bad_request_rejects_forbidden() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(400)
            .create_async()
            .await;
        let adapter = GrokAdapter::with_base_url(server.url());
        assert!(adapter.validate_key("xai-test").await.unwrap());

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(403)
            .create_async()
            .await;
        let adapter = GrokAdapter::with_base_url(server.url());
        assert!(!adapter.validate_key("xai-test").await.unwrap());
    }
}
