//! Deepseek adapter. Text only.
//!
//! OpenAI-shaped chat schema; bearer auth.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{ApiError, ErrorCode, Provider, TextResult};
use tracing::debug;

use crate::adapter::ProviderAdapter;
use crate::http;

const DEFAULT_BASE: &str = "https://api.deepseek.com";
const MODEL: &str = "deepseek-chat";
const SYSTEM_PROMPT: &str = "Você é um especialista em copywriting brasileiro.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
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

pub struct DeepseekAdapter {
    http: Client,
    probe: Client,
    base: String,
}

impl DeepseekAdapter {
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

impl Default for DeepseekAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for DeepseekAdapter {
    fn provider(&self) -> Provider {
        Provider::Deepseek
    }

    async fn generate_text(&self, prompt: &str, api_key: &str) -> Result<TextResult, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base);
        let req = ChatRequest {
            model: MODEL,
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
            max_tokens: 300,
            temperature: 0.7,
        };

        debug!(provider = "deepseek", "text generation request");
        let resp = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(Provider::Deepseek, &e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::from_status(Provider::Deepseek, status, &body));
        }

        let body: ChatResponse = resp.json().await.map_err(|e| {
            ApiError::new(
                ErrorCode::HttpError,
                Provider::Deepseek,
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
            provider: Provider::Deepseek,
            tokens_used: None,
        })
    }

    async fn validate_key(&self, api_key: &str) -> Result<bool, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base);
        let req = ChatRequest {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: "oi",
            }],
            max_tokens: 1,
            temperature: 0.0,
        };

        let resp = self
            .probe
            .post(url)
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(Provider::Deepseek, &e))?;

        let status = resp.status();
        match status.as_u16() {
            200..=299 | 400 => Ok(true),
            401 | 403 => Ok(false),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                Err(ApiError::from_status(Provider::Deepseek, status, &body))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn text_generation_parses_openai_shaped_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer ds-test")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"Só hoje: 20% off!"}}]}"#)
            .create_async()
            .await;

        let adapter = DeepseekAdapter::with_base_url(server.url());
        let result = adapter.generate_text("loja de roupas", "ds-test").await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.content, "Só hoje: 20% off!");
        assert_eq!(result.provider, Provider::Deepseek);
    }

    #[tokio::test]
    async fn rate_limit_classifies_retryable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .create_async()
            .await;

        let adapter = DeepseekAdapter::with_base_url(server.url());
        let err = adapter.generate_text("oi", "ds-test").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RateLimitExceeded);
        assert!(err.retryable());
    }
}
