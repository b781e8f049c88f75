//! Progress model for long-running operations.
//!
//! Five independent categories; the tracker in `services` owns the state,
//! the UI only reads it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The named long-running operation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    TextGeneration,
    ImageGeneration,
    UrlScraping,
    ContentSaving,
    KeyValidation,
}

impl OperationKind {
    pub fn all() -> &'static [OperationKind] {
        &[
            OperationKind::TextGeneration,
            OperationKind::ImageGeneration,
            OperationKind::UrlScraping,
            OperationKind::ContentSaving,
            OperationKind::KeyValidation,
        ]
    }

    /// Default phase message shown when the operation starts.
    pub fn default_message(&self) -> &'static str {
        match self {
            OperationKind::TextGeneration => "Gerando texto promocional...",
            OperationKind::ImageGeneration => "Criando imagem promocional...",
            OperationKind::UrlScraping => "Extraindo informações do produto...",
            OperationKind::ContentSaving => "Salvando conteúdo...",
            OperationKind::KeyValidation => "Validando chave de API...",
        }
    }

    /// Rough duration estimate used by the UI for its progress bar pacing.
    pub fn estimated_duration(&self) -> Duration {
        match self {
            OperationKind::TextGeneration => Duration::from_secs(8),
            OperationKind::ImageGeneration => Duration::from_secs(15),
            OperationKind::UrlScraping => Duration::from_secs(5),
            OperationKind::ContentSaving => Duration::from_secs(2),
            OperationKind::KeyValidation => Duration::from_secs(3),
        }
    }
}

/// Snapshot of one category's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressState {
    pub active: bool,
    /// 0..=100, clamped on write.
    pub percent: u8,
    pub message: String,
    pub started_at: Option<DateTime<Utc>>,
    /// Milliseconds; mirrors `OperationKind::estimated_duration`.
    pub estimated_duration_ms: u64,
}

impl ProgressState {
    pub fn idle() -> Self {
        Self {
            active: false,
            percent: 0,
            message: String::new(),
            started_at: None,
            estimated_duration_ms: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.active
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::idle()
    }
}
