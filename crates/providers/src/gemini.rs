//! Gemini adapter.
//!
//! Auth transport: the key travels as a `?key=` query parameter, not a
//! header. Gemini has no dedicated image endpoint; image requests go to the
//! experimental multimodal model and degrade to a generated SVG placeholder
//! when that endpoint rejects them.

use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{ApiError, ErrorCode, ImageResult, Provider, TextResult};
use tracing::{debug, warn};

use crate::adapter::ProviderAdapter;
use crate::http;

const DEFAULT_BASE: &str = "https://generativelanguage.googleapis.com";
const TEXT_MODEL: &str = "gemini-pro";
const IMAGE_MODEL: &str = "gemini-2.0-flash-exp";

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "inlineData", default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

// ── Adapter ──────────────────────────────────────────────────────────

pub struct GeminiAdapter {
    http: Client,
    probe: Client,
    base: String,
}

impl GeminiAdapter {
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

    fn model_url(&self, model: &str, api_key: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base, model, api_key
        )
    }
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Gemini quirk: a 400 normally means the probe content was rejected by a
/// key that passed auth, except when the body names `API_KEY_INVALID`, which
/// is Gemini's way of reporting a bad key with a 400 instead of a 401. The
/// substring check is deliberate and local to this provider.
fn interpret_probe_status(status: reqwest::StatusCode, body: &str) -> Option<bool> {
    match status.as_u16() {
        200..=299 => Some(true),
        400 => Some(!body.contains("API_KEY_INVALID")),
        401 | 403 => Some(false),
        _ => None,
    }
}

/// Placeholder image when the multimodal endpoint is unavailable: an SVG
/// with the prompt text, shipped as a base64 data URL.
fn placeholder_svg(prompt: &str) -> String {
    let mut text: String = prompt.chars().take(80).collect();
    if prompt.chars().count() > 80 {
        text.push('…');
    }
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    let svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="1024" height="1024" viewBox="0 0 1024 1024"><rect width="1024" height="1024" fill="#3b82f6"/><text x="512" y="512" font-family="sans-serif" font-size="40" fill="#ffffff" text-anchor="middle">{}</text></svg>"##,
        escaped
    );
    format!(
        "data:image/svg+xml;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(svg)
    )
}

#[async_trait::async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate_text(&self, prompt: &str, api_key: &str) -> Result<TextResult, ApiError> {
        let url = self.model_url(TEXT_MODEL, api_key);
        let req = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: format!(
                        "Como especialista em marketing brasileiro, crie um texto promocional \
                         persuasivo para: {}",
                        prompt
                    ),
                }],
            }],
            generation_config: None,
        };

        debug!(provider = "gemini", "text generation request");
        let resp = self
            .http
            .post(url)
            .json(&req)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(Provider::Gemini, &e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::from_status(Provider::Gemini, status, &body));
        }

        let body: GenerateResponse = resp.json().await.map_err(|e| {
            ApiError::new(
                ErrorCode::HttpError,
                Provider::Gemini,
                format!("resposta inesperada: {}", e),
            )
        })?;

        let content = body
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.clone())
            .unwrap_or_default();
        Ok(TextResult {
            content,
            provider: Provider::Gemini,
            tokens_used: None,
        })
    }

    async fn generate_image(&self, prompt: &str, api_key: &str) -> Result<ImageResult, ApiError> {
        let url = self.model_url(IMAGE_MODEL, api_key);
        let req = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: format!("Generate a promotional image for: {}", prompt),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            }),
        };

        debug!(provider = "gemini", "image generation request");
        let resp = self
            .http
            .post(url)
            .json(&req)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(Provider::Gemini, &e))?;

        let status = resp.status();
        if status.as_u16() == 400 || status.as_u16() == 404 {
            // Multimodal endpoint unavailable for this key or model rollout.
            // Degrade to a placeholder rather than failing the wizard.
            warn!(provider = "gemini", %status, "image endpoint rejected, using placeholder");
            return Ok(ImageResult {
                url: placeholder_svg(prompt),
                provider: Provider::Gemini,
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::from_status(Provider::Gemini, status, &body));
        }

        let body: GenerateResponse = resp.json().await.map_err(|e| {
            ApiError::new(
                ErrorCode::HttpError,
                Provider::Gemini,
                format!("resposta inesperada: {}", e),
            )
        })?;

        let inline = body
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.iter().find_map(|p| p.inline_data.as_ref()));

        let url = match inline {
            Some(data) => format!("data:{};base64,{}", data.mime_type, data.data),
            // Model answered with text only; same degrade path.
            None => placeholder_svg(prompt),
        };
        Ok(ImageResult {
            url,
            provider: Provider::Gemini,
        })
    }

    async fn validate_key(&self, api_key: &str) -> Result<bool, ApiError> {
        let url = self.model_url(TEXT_MODEL, api_key);
        let req = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "oi".to_string(),
                }],
            }],
            generation_config: None,
        };

        let resp = self
            .probe
            .post(url)
            .json(&req)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(Provider::Gemini, &e))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        match interpret_probe_status(status, &body) {
            Some(valid) => Ok(valid),
            None => Err(ApiError::from_status(Provider::Gemini, status, &body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn text_generation_reads_first_candidate_part() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-pro:generateContent?key=AIza-test",
            )
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"Aproveite o lançamento!"}]}}]}"#,
            )
            .create_async()
            .await;

        let adapter = GeminiAdapter::with_base_url(server.url());
        let result = adapter.generate_text("novo curso", "AIza-test").await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.content, "Aproveite o lançamento!");
        assert_eq!(result.provider, Provider::Gemini);
    }

    #[test]
    fn probe_status_interpretation_covers_the_api_key_invalid_quirk() {
        use reqwest::StatusCode;

        assert_eq!(interpret_probe_status(StatusCode::OK, ""), Some(true));
        // Plain 400: content rejected, key fine.
        assert_eq!(
            interpret_probe_status(StatusCode::BAD_REQUEST, r#"{"error":{"message":"empty"}}"#),
            Some(true)
        );
        // 400 naming the key: invalid.
        assert_eq!(
            interpret_probe_status(
                StatusCode::BAD_REQUEST,
                r#"{"error":{"status":"INVALID_ARGUMENT","message":"API_KEY_INVALID"}}"#
            ),
            Some(false)
        );
        assert_eq!(interpret_probe_status(StatusCode::UNAUTHORIZED, ""), Some(false));
        assert_eq!(interpret_probe_status(StatusCode::FORBIDDEN, ""), Some(false));
        assert_eq!(interpret_probe_status(StatusCode::TOO_MANY_REQUESTS, ""), None);
    }

    #[tokio::test]
    async fn image_falls_back_to_placeholder_on_404() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                "/v1beta/models/gemini-2.0-flash-exp:generateContent?key=AIza-test",
            )
            .with_status(404)
            .create_async()
            .await;

        let adapter = GeminiAdapter::with_base_url(server.url());
        let result = adapter.generate_image("promoção de inverno", "AIza-test").await.unwrap();
        assert!(result.url.starts_with("data:image/svg+xml;base64,"));
        assert_eq!(result.provider, Provider::Gemini);
    }

    #[tokio::test]
    async fn image_decodes_inline_data_on_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                "/v1beta/models/gemini-2.0-flash-exp:generateContent?key=AIza-test",
            )
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"parts":[
                    {"text":"here you go"},
                    {"inlineData":{"mimeType":"image/png","data":"aGVsbG8="}}
                ]}}]}"#,
            )
            .create_async()
            .await;

        let adapter = GeminiAdapter::with_base_url(server.url());
        let result = adapter.generate_image("banner", "AIza-test").await.unwrap();
        assert_eq!(result.url, "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn placeholder_escapes_markup_and_truncates() {
        let url = placeholder_svg("<script> & promo");
        let encoded = url.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = String::from_utf8(
            base64::engine::general_purpose::STANDARD.decode(encoded).unwrap(),
        )
        .unwrap();
        assert!(svg.contains("&lt;script&gt; &amp; promo"));

        let long: String = "a".repeat(200);
        let url = placeholder_svg(&long);
        let encoded = url.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = String::from_utf8(
            base64::engine::general_purpose::STANDARD.decode(encoded).unwrap(),
        )
        .unwrap();
        assert!(svg.contains(&"a".repeat(80)));
        assert!(!svg.contains(&"a".repeat(81)));
    }
}
