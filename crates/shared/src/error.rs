//! Classified errors for provider calls.
//!
//! Adapters never leak a raw transport error: every failure is mapped to an
//! [`ApiError`] carrying a machine-readable [`ErrorCode`], the provider it
//! came from, and a user-facing message. The retry dispatcher keys off
//! [`ErrorCode::is_retryable`].

use serde::{Deserialize, Serialize};

use crate::types::Provider;

/// Machine-readable failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// HTTP 401 — credential rejected.
    InvalidApiKey,
    /// HTTP 403 — credential accepted but lacks permission or quota.
    AccessDenied,
    /// HTTP 429.
    RateLimitExceeded,
    /// HTTP 5xx.
    ServerError,
    /// Transport-level timeout.
    Timeout,
    /// DNS or connection failure.
    NetworkError,
    /// Operation the provider does not offer (e.g. images on a text-only
    /// provider). Raised before any network call.
    UnsupportedOperation,
    /// Any other non-success status.
    HttpError,
}

impl ErrorCode {
    /// Transient failures worth a backoff retry. Auth and permission
    /// failures are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::RateLimitExceeded
                | ErrorCode::ServerError
                | ErrorCode::Timeout
                | ErrorCode::NetworkError
        )
    }
}

/// A classified provider failure.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{} [{code:?}]: {message}", provider.display_name())]
pub struct ApiError {
    pub code: ErrorCode,
    pub provider: Provider,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, provider: Provider, message: impl Into<String>) -> Self {
        Self {
            code,
            provider,
            message: message.into(),
        }
    }

    pub fn retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn unsupported_operation(provider: Provider, what: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedOperation,
            provider,
            format!("{} não suporta {}", provider.display_name(), what),
        )
    }

    /// Classify a non-success HTTP status. The body, when it is a JSON
    /// payload with the provider's own error message, feeds the fallback
    /// `HttpError` message.
    pub fn from_status(provider: Provider, status: reqwest::StatusCode, body: &str) -> Self {
        let (code, message) = match status.as_u16() {
            401 => (
                ErrorCode::InvalidApiKey,
                "Chave de API inválida ou expirada".to_string(),
            ),
            403 => (
                ErrorCode::AccessDenied,
                "Acesso negado. Verifique suas permissões de API.".to_string(),
            ),
            429 => (
                ErrorCode::RateLimitExceeded,
                "Limite de requisições excedido. Tente novamente em alguns minutos.".to_string(),
            ),
            500..=599 => (
                ErrorCode::ServerError,
                "Erro interno do servidor. Tente novamente mais tarde.".to_string(),
            ),
            other => {
                let detail = extract_error_message(body)
                    .unwrap_or_else(|| format!("Erro HTTP {}", other));
                (ErrorCode::HttpError, detail)
            }
        };
        Self::new(code, provider, message)
    }

    /// Classify a transport failure (timeout, DNS, refused connection).
    pub fn from_transport(provider: Provider, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(
                ErrorCode::Timeout,
                provider,
                "Timeout da requisição. Tente novamente.",
            )
        } else {
            Self::new(
                ErrorCode::NetworkError,
                provider,
                "Erro de conexão. Verifique sua internet.",
            )
        }
    }
}

/// Pull the provider's own message out of an error payload, tolerating the
/// two shapes seen in practice: `{"error": {"message": ...}}` and
/// `{"error": "..."}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    if let Some(msg) = error.get("message").and_then(|m| m.as_str()) {
        return Some(msg.to_string());
    }
    error.as_str().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_codes() {
        assert!(ErrorCode::RateLimitExceeded.is_retryable());
        assert!(ErrorCode::ServerError.is_retryable());
        assert!(ErrorCode::Timeout.is_retryable());
        assert!(ErrorCode::NetworkError.is_retryable());

        assert!(!ErrorCode::InvalidApiKey.is_retryable());
        assert!(!ErrorCode::AccessDenied.is_retryable());
        assert!(!ErrorCode::UnsupportedOperation.is_retryable());
        assert!(!ErrorCode::HttpError.is_retryable());
    }

    #[test]
    fn status_mapping() {
        let err = ApiError::from_status(
            Provider::OpenAi,
            reqwest::StatusCode::UNAUTHORIZED,
            "",
        );
        assert_eq!(err.code, ErrorCode::InvalidApiKey);
        assert!(!err.retryable());

        let err = ApiError::from_status(
            Provider::Claude,
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "",
        );
        assert_eq!(err.code, ErrorCode::RateLimitExceeded);
        assert!(err.retryable());

        let err = ApiError::from_status(
            Provider::Gemini,
            reqwest::StatusCode::BAD_GATEWAY,
            "",
        );
        assert_eq!(err.code, ErrorCode::ServerError);
    }

    #[test]
    fn http_error_picks_up_provider_message() {
        let body = r#"{"error": {"message": "model not found", "type": "invalid_request_error"}}"#;
        let err = ApiError::from_status(Provider::OpenAi, reqwest::StatusCode::NOT_FOUND, body);
        assert_eq!(err.code, ErrorCode::HttpError);
        assert_eq!(err.message, "model not found");

        let err = ApiError::from_status(Provider::Grok, reqwest::StatusCode::NOT_FOUND, "oops");
        assert_eq!(err.message, "Erro HTTP 404");
    }
}
