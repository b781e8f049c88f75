//! Provider orchestration: one HTTP adapter per AI service, a fixed
//! registry, retry with backoff, key validation, and the `ApiService`
//! façade the UI calls.

pub mod adapter;
pub mod claude;
pub mod deepseek;
pub mod gemini;
pub mod grok;
mod http;
pub mod openai;
pub mod retry;
pub mod service;
pub mod validation;

pub use adapter::{AdapterRegistry, ProviderAdapter};
pub use retry::{with_retry, DEFAULT_MAX_ATTEMPTS};
pub use service::ApiService;
pub use validation::{ValidationEngine, ValidationState};
