//! Domain types shared across the workspace.
//!
//! The `Provider` enum is the lookup key for everything provider-scoped:
//! adapters, stored credentials, validation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The fixed set of generative-AI services the studio integrates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Claude,
    Gemini,
    Grok,
    Deepseek,
}

impl Provider {
    pub fn all() -> &'static [Provider] {
        &[
            Provider::OpenAi,
            Provider::Claude,
            Provider::Gemini,
            Provider::Grok,
            Provider::Deepseek,
        ]
    }

    /// Stable identifier used in storage and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
            Provider::Grok => "grok",
            Provider::Deepseek => "deepseek",
        }
    }

    pub fn from_str(s: &str) -> Option<Provider> {
        match s {
            "openai" => Some(Provider::OpenAi),
            "claude" => Some(Provider::Claude),
            "gemini" => Some(Provider::Gemini),
            "grok" => Some(Provider::Grok),
            "deepseek" => Some(Provider::Deepseek),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Claude => "Claude",
            Provider::Gemini => "Gemini",
            Provider::Grok => "Grok",
            Provider::Deepseek => "Deepseek",
        }
    }

    /// Only OpenAI and Gemini expose an image path; everything else is
    /// text-only and must fail fast on image requests.
    pub fn supports_images(&self) -> bool {
        matches!(self, Provider::OpenAi | Provider::Gemini)
    }
}

/// Kind of promotion the user is drafting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionType {
    Discount,
    Event,
    Launch,
    General,
}

impl PromotionType {
    pub fn label(&self) -> &'static str {
        match self {
            PromotionType::Discount => "💰 Desconto",
            PromotionType::Event => "🎉 Evento",
            PromotionType::Launch => "🚀 Lançamento",
            PromotionType::General => "📢 Geral",
        }
    }
}

impl Default for PromotionType {
    fn default() -> Self {
        PromotionType::General
    }
}

/// Colors applied to the post preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSettings {
    pub background: String,
    pub text: String,
    pub accent: String,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#000000".to_string(),
            accent: "#3b82f6".to_string(),
        }
    }
}

/// One promotional draft: the user's input plus everything generated for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentData {
    pub id: String,
    pub description: String,
    pub promotion_type: PromotionType,
    pub generated_text: String,
    /// Hosted URL or `data:` URL for the generated image.
    pub generated_image: String,
    pub colors: ColorSettings,
    pub selected_provider: Provider,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentData {
    /// Blank draft with a fresh id.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            description: String::new(),
            promotion_type: PromotionType::default(),
            generated_text: String::new(),
            generated_image: String::new(),
            colors: ColorSettings::default(),
            selected_provider: Provider::OpenAi,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for ContentData {
    fn default() -> Self {
        Self::new()
    }
}

/// Successful text generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextResult {
    pub content: String,
    pub provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
}

/// Successful image generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    pub url: String,
    pub provider: Provider,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_roundtrip() {
        for p in Provider::all() {
            assert_eq!(Provider::from_str(p.as_str()), Some(*p));
        }
        assert_eq!(Provider::from_str("copilot"), None);
    }

    #[test]
    fn image_support_is_limited_to_two_providers() {
        let capable: Vec<_> = Provider::all()
            .iter()
            .filter(|p| p.supports_images())
            .collect();
        assert_eq!(capable, vec![&Provider::OpenAi, &Provider::Gemini]);
    }

    #[test]
    fn new_content_has_unique_ids() {
        let a = ContentData::new();
        let b = ContentData::new();
        assert_ne!(a.id, b.id);
        assert!(a.generated_text.is_empty());
    }
}
