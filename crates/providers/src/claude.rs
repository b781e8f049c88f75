//! Claude (Anthropic) adapter. Text only.
//!
//! Auth transport: `x-api-key` header plus a pinned `anthropic-version`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{ApiError, ErrorCode, Provider, TextResult};
use tracing::debug;

use crate::adapter::ProviderAdapter;
use crate::http;

const DEFAULT_BASE: &str = "https://api.anthropic.com";
const MODEL: &str = "claude-3-haiku-20240307";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

// ── Adapter ──────────────────────────────────────────────────────────

pub struct ClaudeAdapter {
    http: Client,
    probe: Client,
    base: String,
}

impl ClaudeAdapter {
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

impl Default for ClaudeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for ClaudeAdapter {
    fn provider(&self) -> Provider {
        Provider::Claude
    }

    async fn generate_text(&self, prompt: &str, api_key: &str) -> Result<TextResult, ApiError> {
        let url = format!("{}/v1/messages", self.base);
        let req = MessagesRequest {
            model: MODEL,
            max_tokens: 300,
            messages: vec![Message {
                role: "user",
                content: format!(
                    "Como especialista em copywriting brasileiro, crie um texto promocional \
                     persuasivo para: {}",
                    prompt
                ),
            }],
        };

        debug!(provider = "claude", "text generation request");
        let resp = self
            .http
            .post(url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(Provider::Claude, &e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::from_status(Provider::Claude, status, &body));
        }

        let body: MessagesResponse = resp.json().await.map_err(|e| {
            ApiError::new(
                ErrorCode::HttpError,
                Provider::Claude,
                format!("resposta inesperada: {}", e),
            )
        })?;

        let content = body.content.first().map(|c| c.text.clone()).unwrap_or_default();
        Ok(TextResult {
            content,
            provider: Provider::Claude,
            tokens_used: None,
        })
    }

    async fn validate_key(&self, api_key: &str) -> Result<bool, ApiError> {
        // Minimal 1-token request. Only the auth layer matters here: a 400
        // means the content was rejected but the key passed authentication,
        // so it still counts as valid.
        let url = format!("{}/v1/messages", self.base);
        let req = MessagesRequest {
            model: MODEL,
            max_tokens: 1,
            messages: vec![Message {
                role: "user",
                content: "oi".to_string(),
            }],
        };

        let resp = self
            .probe
            .post(url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(Provider::Claude, &e))?;

        let status = resp.status();
        match status.as_u16() {
            200..=299 | 400 => Ok(true),
            401 | 403 => Ok(false),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                Err(ApiError::from_status(Provider::Claude, status, &body))
            }
        }
    }
}
