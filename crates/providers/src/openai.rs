//! OpenAI adapter: chat completions for copy, DALL-E for imagery.
//!
//! Auth transport: `Authorization: Bearer <key>`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{ApiError, ErrorCode, ImageResult, Provider, TextResult};
use tracing::debug;

use crate::adapter::ProviderAdapter;
use crate::http;

const DEFAULT_BASE: &str = "https://api.openai.com";
const TEXT_MODEL: &str = "gpt-3.5-turbo";
const SYSTEM_PROMPT: &str = "Você é um especialista em copywriting para marketing brasileiro. \
    Crie textos promocionais persuasivos, diretos e adequados ao público brasileiro.";

// ── Wire types ───────────────────────────────────────────────────────

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
    #[serde(default)]
    usage: Option<Usage>,
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

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    prompt: String,
    n: u32,
    size: &'static str,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: String,
}

// ── Adapter ──────────────────────────────────────────────────────────

pub struct OpenAiAdapter {
    http: Client,
    probe: Client,
    base: String,
}

impl OpenAiAdapter {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE)
    }

    /// Point the adapter at a different base URL (mock server in tests).
    pub fn with_base_url(base: impl Into<String>) -> Self {
        Self {
            http: http::generation_client(),
            probe: http::probe_client(),
            base: base.into(),
        }
    }
}

impl Default for OpenAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn generate_text(&self, prompt: &str, api_key: &str) -> Result<TextResult, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base);
        let req = ChatRequest {
            model: TEXT_MODEL,
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

        debug!(provider = "openai", "text generation request");
        let resp = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(Provider::OpenAi, &e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::from_status(Provider::OpenAi, status, &body));
        }

        let body: ChatResponse = resp.json().await.map_err(|e| {
            ApiError::new(
                ErrorCode::HttpError,
                Provider::OpenAi,
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
            provider: Provider::OpenAi,
            tokens_used: body.usage.and_then(|u| u.total_tokens),
        })
    }

    async fn generate_image(&self, prompt: &str, api_key: &str) -> Result<ImageResult, ApiError> {
        let url = format!("{}/v1/images/generations", self.base);
        let req = ImageRequest {
            prompt: format!("Professional promotional image for: {}", prompt),
            n: 1,
            size: "1024x1024",
            response_format: "url",
        };

        debug!(provider = "openai", "image generation request");
        let resp = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(Provider::OpenAi, &e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::from_status(Provider::OpenAi, status, &body));
        }

        let body: ImageResponse = resp.json().await.map_err(|e| {
            ApiError::new(
                ErrorCode::HttpError,
                Provider::OpenAi,
                format!("resposta inesperada: {}", e),
            )
        })?;

        let url = body
            .data
            .into_iter()
            .next()
            .map(|d| d.url)
            .unwrap_or_default();
        Ok(ImageResult {
            url,
            provider: Provider::OpenAi,
        })
    }

    async fn validate_key(&self, api_key: &str) -> Result<bool, ApiError> {
        // A models listing is the cheapest authenticated call OpenAI has.
        let url = format!("{}/v1/models", self.base);
        let resp = self
            .probe
            .get(url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(Provider::OpenAi, &e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(true);
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Ok(false);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::from_status(Provider::OpenAi, status, &body))
    }
}
