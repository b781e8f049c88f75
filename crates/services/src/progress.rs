//! Progress tracking for the five long-running operation categories.
//!
//! Categories are independent: a text generation and an image generation
//! can be in flight at once. The tracker guarantees every category comes
//! back to idle, including when the wrapped operation fails.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use shared::progress::{OperationKind, ProgressState};
use tracing::debug;

const COMPLETE_RESET_DELAY: Duration = Duration::from_secs(2);
const ERROR_COMPLETE_DELAY: Duration = Duration::from_secs(1);

struct Inner {
    states: RwLock<HashMap<OperationKind, ProgressState>>,
    /// Bumped on every `start`; a delayed reset only fires if its category
    /// was not restarted in the meantime.
    epochs: RwLock<HashMap<OperationKind, u64>>,
    complete_delay: Duration,
    error_delay: Duration,
}

#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Inner>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::with_delays(COMPLETE_RESET_DELAY, ERROR_COMPLETE_DELAY)
    }

    /// Custom cleanup delays (tests shrink these).
    pub fn with_delays(complete_delay: Duration, error_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                states: RwLock::new(HashMap::new()),
                epochs: RwLock::new(HashMap::new()),
                complete_delay,
                error_delay,
            }),
        }
    }

    pub fn start(&self, kind: OperationKind) {
        self.bump_epoch(kind);
        let mut states = self.inner.states.write();
        states.insert(
            kind,
            ProgressState {
                active: true,
                percent: 0,
                message: kind.default_message().to_string(),
                started_at: Some(Utc::now()),
                estimated_duration_ms: kind.estimated_duration().as_millis() as u64,
            },
        );
        debug!(?kind, "operation started");
    }

    /// Update one category's percentage (clamped to 0..=100) and
    /// optionally its phase message.
    pub fn set_progress(&self, kind: OperationKind, percent: u8, message: Option<&str>) {
        let mut states = self.inner.states.write();
        let state = states.entry(kind).or_default();
        state.percent = percent.min(100);
        if let Some(message) = message {
            state.message = message.to_string();
        }
    }

    /// Mark a category finished and schedule its reset back to a blank
    /// idle state after a bounded delay.
    pub fn complete(&self, kind: OperationKind) {
        let epoch = self.current_epoch(kind);
        {
            let mut states = self.inner.states.write();
            let state = states.entry(kind).or_default();
            state.active = false;
            state.percent = 100;
            state.message = "Concluído".to_string();
        }
        debug!(?kind, "operation complete");

        let tracker = self.clone();
        let delay = self.inner.complete_delay;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    tracker.reset_if_unchanged(kind, epoch);
                });
            }
            // No runtime (sync caller): reset right away.
            Err(_) => self.reset_if_unchanged(kind, epoch),
        }
    }

    pub fn reset_all(&self) {
        for kind in OperationKind::all() {
            self.bump_epoch(*kind);
        }
        self.inner.states.write().clear();
    }

    pub fn snapshot(&self, kind: OperationKind) -> ProgressState {
        self.inner
            .states
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_active(&self, kind: OperationKind) -> bool {
        self.snapshot(kind).active
    }

    /// Run a future under a category. Success completes the category;
    /// failure publishes an error phase, still drives the category to idle
    /// after a bounded delay, and propagates the error unchanged.
    pub async fn run_tracked<T, E, Fut>(&self, kind: OperationKind, fut: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        self.start(kind);
        match fut.await {
            Ok(value) => {
                self.complete(kind);
                Ok(value)
            }
            Err(err) => {
                self.set_progress(kind, 0, Some("Erro na operação"));
                let tracker = self.clone();
                let delay = self.inner.error_delay;
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        tokio::time::sleep(delay).await;
                        tracker.complete(kind);
                    });
                } else {
                    self.complete(kind);
                }
                Err(err)
            }
        }
    }

    fn reset_if_unchanged(&self, kind: OperationKind, epoch: u64) {
        if self.current_epoch(kind) != epoch {
            return;
        }
        self.inner.states.write().insert(kind, ProgressState::idle());
    }

    fn bump_epoch(&self, kind: OperationKind) {
        let mut epochs = self.inner.epochs.write();
        *epochs.entry(kind).or_insert(0) += 1;
    }

    fn current_epoch(&self, kind: OperationKind) -> u64 {
        *self.inner.epochs.read().get(&kind).unwrap_or(&0)
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_tracker() -> ProgressTracker {
        ProgressTracker::with_delays(Duration::from_millis(20), Duration::from_millis(20))
    }

    #[tokio::test]
    async fn start_progress_complete_lifecycle() {
        let tracker = fast_tracker();

        tracker.start(OperationKind::TextGeneration);
        let state = tracker.snapshot(OperationKind::TextGeneration);
        assert!(state.active);
        assert_eq!(state.percent, 0);
        assert_eq!(state.message, "Gerando texto promocional...");

        tracker.set_progress(OperationKind::TextGeneration, 60, Some("Quase lá..."));
        let state = tracker.snapshot(OperationKind::TextGeneration);
        assert_eq!(state.percent, 60);
        assert_eq!(state.message, "Quase lá...");

        tracker.complete(OperationKind::TextGeneration);
        let state = tracker.snapshot(OperationKind::TextGeneration);
        assert!(!state.active);
        assert_eq!(state.percent, 100);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let state = tracker.snapshot(OperationKind::TextGeneration);
        assert!(state.is_idle());
        assert_eq!(state.percent, 0);
    }

    #[tokio::test]
    async fn percent_is_clamped() {
        let tracker = fast_tracker();
        tracker.start(OperationKind::ContentSaving);
        tracker.set_progress(OperationKind::ContentSaving, 250, None);
        assert_eq!(tracker.snapshot(OperationKind::ContentSaving).percent, 100);
    }

    #[tokio::test]
    async fn categories_are_independent() {
        let tracker = fast_tracker();
        tracker.start(OperationKind::TextGeneration);
        tracker.start(OperationKind::ImageGeneration);

        tracker.complete(OperationKind::TextGeneration);
        assert!(!tracker.is_active(OperationKind::TextGeneration));
        assert!(tracker.is_active(OperationKind::ImageGeneration));
    }

    #[tokio::test]
    async fn failing_tracked_operation_still_reaches_idle() {
        let tracker = fast_tracker();

        let result: Result<(), &str> = tracker
            .run_tracked(OperationKind::ImageGeneration, async { Err("boom") })
            .await;
        assert_eq!(result.unwrap_err(), "boom");

        let state = tracker.snapshot(OperationKind::ImageGeneration);
        assert_eq!(state.message, "Erro na operação");

        // Bounded cleanup: error delay + reset delay, plus slack.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(tracker.snapshot(OperationKind::ImageGeneration).is_idle());
    }

    #[tokio::test]
    async fn successful_tracked_operation_completes() {
        let tracker = fast_tracker();

        let result: Result<u32, ()> = tracker
            .run_tracked(OperationKind::KeyValidation, async { Ok(7) })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert!(!tracker.is_active(OperationKind::KeyValidation));
    }

    #[tokio::test]
    async fn restart_cancels_pending_reset() {
        let tracker = fast_tracker();

        tracker.start(OperationKind::UrlScraping);
        tracker.complete(OperationKind::UrlScraping);
        // Restart before the delayed reset fires.
        tracker.start(OperationKind::UrlScraping);
        tracker.set_progress(OperationKind::UrlScraping, 40, None);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let state = tracker.snapshot(OperationKind::UrlScraping);
        assert!(state.active, "stale reset must not clobber a restarted operation");
        assert_eq!(state.percent, 40);
    }

    #[tokio::test]
    async fn reset_all_clears_every_category() {
        let tracker = fast_tracker();
        tracker.start(OperationKind::TextGeneration);
        tracker.start(OperationKind::KeyValidation);

        tracker.reset_all();
        for kind in OperationKind::all() {
            assert!(tracker.snapshot(*kind).is_idle());
        }
    }
}
