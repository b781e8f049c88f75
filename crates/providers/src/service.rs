//! UI-facing façade over the adapter registry.
//!
//! Generation calls are wrapped in the retry dispatcher; key validation is
//! single-shot (the validation engine owns caching and debounce on top of
//! this).

use std::sync::Arc;

use shared::{ApiError, ImageResult, Provider, TextResult};
use tracing::info;

use crate::adapter::AdapterRegistry;
use crate::retry::{with_retry, DEFAULT_MAX_ATTEMPTS};

pub struct ApiService {
    registry: Arc<AdapterRegistry>,
    max_attempts: u32,
}

impl ApiService {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(AdapterRegistry::new()))
    }

    pub fn with_registry(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn registry(&self) -> Arc<AdapterRegistry> {
        self.registry.clone()
    }

    pub async fn generate_text(
        &self,
        prompt: &str,
        provider: Provider,
        api_key: &str,
    ) -> Result<TextResult, ApiError> {
        info!(provider = provider.as_str(), "generate_text");
        let adapter = self.registry.get(provider);
        with_retry(self.max_attempts, || adapter.generate_text(prompt, api_key)).await
    }

    pub async fn generate_image(
        &self,
        prompt: &str,
        provider: Provider,
        api_key: &str,
    ) -> Result<ImageResult, ApiError> {
        // Fail fast before any dispatch for text-only providers.
        if !provider.supports_images() {
            return Err(ApiError::unsupported_operation(
                provider,
                "geração de imagens",
            ));
        }
        info!(provider = provider.as_str(), "generate_image");
        let adapter = self.registry.get(provider);
        with_retry(self.max_attempts, || adapter.generate_image(prompt, api_key)).await
    }

    /// Single probe against the provider; no cache, no debounce, no retry.
    pub async fn validate_api_key(
        &self,
        provider: Provider,
        api_key: &str,
    ) -> Result<bool, ApiError> {
        let adapter = self.registry.get(provider);
        adapter.validate_key(api_key).await
    }
}

impl Default for ApiService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::OpenAiAdapter;
    use shared::ErrorCode;

    fn service_for(server: &mockito::Server) -> ApiService {
        let registry = AdapterRegistry::new()
            .with_adapter(Arc::new(OpenAiAdapter::with_base_url(server.url())));
        ApiService::with_registry(Arc::new(registry))
    }

    #[tokio::test]
    async fn generate_text_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(
                r#"{"choices":[{"message":{"content":"Invista no seu futuro: curso de marketing com 50% off!"}}],
                    "usage":{"total_tokens":28}}"#,
            )
            .create_async()
            .await;

        let service = service_for(&server);
        let result = service
            .generate_text(
                "Promova um curso de marketing",
                Provider::OpenAi,
                "sk-valid",
            )
            .await
            .unwrap();

        assert_eq!(
            result.content,
            "Invista no seu futuro: curso de marketing com 50% off!"
        );
        assert_eq!(result.provider, Provider::OpenAi);
        assert_eq!(result.tokens_used, Some(28));
    }

    #[tokio::test]
    async fn image_on_text_only_provider_fails_before_any_network_call() {
        // Default registry: a network attempt would hit the real provider
        // hosts; UnsupportedOperation must short-circuit first.
        let service = ApiService::new();
        let err = service
            .generate_image("banner promocional", Provider::Deepseek, "ds-test")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedOperation);
        assert_eq!(err.provider, Provider::Deepseek);
    }

    #[tokio::test]
    async fn invalid_key_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let service = service_for(&server);
        let err = service
            .generate_text("oi", Provider::OpenAi, "sk-bad")
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.code, ErrorCode::InvalidApiKey);
    }
}
