//! Adapter trait and the fixed provider registry.
//!
//! Each adapter translates the canonical `{prompt, api_key}` pair into its
//! provider's wire format and maps every failure to a classified
//! [`ApiError`]. The registry is a fixed table over the `Provider` enum, so
//! dispatch is exhaustive at construction time.

use std::collections::HashMap;
use std::sync::Arc;

use shared::{ApiError, ImageResult, Provider, TextResult};

use crate::claude::ClaudeAdapter;
use crate::deepseek::DeepseekAdapter;
use crate::gemini::GeminiAdapter;
use crate::grok::GrokAdapter;
use crate::openai::OpenAiAdapter;

/// One AI provider's HTTP surface.
///
/// Note: uses async_trait for object safety.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which provider this adapter speaks for.
    fn provider(&self) -> Provider;

    async fn generate_text(&self, prompt: &str, api_key: &str) -> Result<TextResult, ApiError>;

    /// Image generation. Text-only providers keep this default, which fails
    /// fast with `UnsupportedOperation` before any network call.
    async fn generate_image(&self, prompt: &str, api_key: &str) -> Result<ImageResult, ApiError> {
        let _ = (prompt, api_key);
        Err(ApiError::unsupported_operation(
            self.provider(),
            "geração de imagens",
        ))
    }

    /// Probe the provider with a minimal request and interpret only the
    /// auth-layer response: `Ok(true)` key accepted, `Ok(false)` key
    /// rejected, `Err` for failures that say nothing about the key
    /// (timeouts, rate limits, server errors).
    async fn validate_key(&self, api_key: &str) -> Result<bool, ApiError>;
}

/// Fixed lookup table `Provider -> adapter`, covering all five members.
pub struct AdapterRegistry {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Registry with the default adapter for every provider.
    pub fn new() -> Self {
        let mut adapters: HashMap<Provider, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert(Provider::OpenAi, Arc::new(OpenAiAdapter::new()));
        adapters.insert(Provider::Claude, Arc::new(ClaudeAdapter::new()));
        adapters.insert(Provider::Gemini, Arc::new(GeminiAdapter::new()));
        adapters.insert(Provider::Grok, Arc::new(GrokAdapter::new()));
        adapters.insert(Provider::Deepseek, Arc::new(DeepseekAdapter::new()));
        Self { adapters }
    }

    /// Replace one adapter (tests point providers at a mock server).
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.provider(), adapter);
        self
    }

    /// Infallible: `new()` registers every `Provider` member and
    /// `with_adapter` only replaces entries.
    pub fn get(&self, provider: Provider) -> Arc<dyn ProviderAdapter> {
        self.adapters
            .get(&provider)
            .cloned()
            .expect("registry covers every provider")
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
