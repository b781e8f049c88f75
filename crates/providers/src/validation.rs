//! API key validation with a TTL cache and keystroke debounce.
//!
//! Validation fires on every credential edit in the configuration screen,
//! so the engine has to protect the providers from itself: an exact
//! `(provider, key)` cache avoids re-probing an unchanged key for five
//! minutes, and a one-second debounce collapses a burst of edits into a
//! single probe for the final value. Probe failures never propagate; they
//! land in the per-provider [`ValidationState`] the UI renders.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shared::Provider;
use tokio::time::Instant;
use tracing::debug;

use crate::adapter::AdapterRegistry;

pub const DEBOUNCE: Duration = Duration::from_millis(1000);
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

const INVALID_KEY_MESSAGE: &str = "Chave de API inválida ou expirada";

/// Per-provider validation status, as the UI sees it.
#[derive(Debug, Clone, Default)]
pub struct ValidationState {
    pub is_validating: bool,
    /// `None` until a probe has resolved for the current key.
    pub is_valid: Option<bool>,
    pub error: Option<String>,
    pub last_checked: Option<DateTime<Utc>>,
}

struct CacheEntry {
    is_valid: bool,
    checked_at: Instant,
}

pub struct ValidationEngine {
    registry: Arc<AdapterRegistry>,
    states: RwLock<HashMap<Provider, ValidationState>>,
    /// Keyed by the exact (provider, key string) pair; in-memory only.
    cache: RwLock<HashMap<(Provider, String), CacheEntry>>,
    /// Debounce generation counter per provider. A newer call bumps the
    /// epoch; a pending sleeper whose epoch went stale gives up.
    epochs: RwLock<HashMap<Provider, u64>>,
    debounce: Duration,
    cache_ttl: Duration,
}

impl ValidationEngine {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self::with_timings(registry, DEBOUNCE, CACHE_TTL)
    }

    /// Custom debounce/TTL windows (tests shrink these).
    pub fn with_timings(
        registry: Arc<AdapterRegistry>,
        debounce: Duration,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            registry,
            states: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
            epochs: RwLock::new(HashMap::new()),
            debounce,
            cache_ttl,
        }
    }

    /// Validate a key. `immediate` bypasses both cache and debounce.
    ///
    /// Never panics and never bubbles an error: a failed probe resolves to
    /// `false` with the message stored in the provider's state. A debounced
    /// call that gets superseded by a newer edit returns `false` without
    /// probing; only the last scheduled probe runs.
    pub async fn validate(&self, provider: Provider, key: &str, immediate: bool) -> bool {
        let key = key.trim();
        if key.is_empty() {
            self.clear(provider);
            return false;
        }

        if !immediate {
            if let Some(valid) = self.cached(provider, key) {
                debug!(provider = provider.as_str(), "validation cache hit");
                self.publish(provider, |s| {
                    s.is_validating = false;
                    s.is_valid = Some(valid);
                    s.error = if valid { None } else { Some(INVALID_KEY_MESSAGE.into()) };
                    s.last_checked = Some(Utc::now());
                });
                return valid;
            }
        }

        let epoch = self.bump_epoch(provider);
        if !immediate {
            tokio::time::sleep(self.debounce).await;
            if self.current_epoch(provider) != epoch {
                // A newer edit took over this provider's slot.
                return false;
            }
        }

        self.probe(provider, key).await
    }

    /// Immediately validate every non-empty key in the map (used when the
    /// configuration screen opens with stored credentials).
    pub async fn validate_all(&self, keys: &HashMap<Provider, String>) {
        let probes = keys
            .iter()
            .filter(|(_, key)| !key.trim().is_empty())
            .map(|(provider, key)| self.validate(*provider, key, true));
        futures::future::join_all(probes).await;
    }

    /// Cancel any pending debounce and reset the provider to unknown.
    pub fn clear(&self, provider: Provider) {
        self.bump_epoch(provider);
        self.publish(provider, |s| {
            *s = ValidationState::default();
        });
    }

    /// Snapshot of one provider's state.
    pub fn state(&self, provider: Provider) -> ValidationState {
        self.states
            .read()
            .get(&provider)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_any_validating(&self) -> bool {
        self.states.read().values().any(|s| s.is_validating)
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn probe(&self, provider: Provider, key: &str) -> bool {
        self.publish(provider, |s| {
            s.is_validating = true;
            s.error = None;
        });

        let adapter = self.registry.get(provider);
        match adapter.validate_key(key).await {
            Ok(valid) => {
                self.cache.write().insert(
                    (provider, key.to_string()),
                    CacheEntry {
                        is_valid: valid,
                        checked_at: Instant::now(),
                    },
                );
                self.publish(provider, |s| {
                    s.is_validating = false;
                    s.is_valid = Some(valid);
                    s.error = if valid { None } else { Some(INVALID_KEY_MESSAGE.into()) };
                    s.last_checked = Some(Utc::now());
                });
                valid
            }
            Err(err) => {
                debug!(
                    provider = provider.as_str(),
                    code = ?err.code,
                    "validation probe failed"
                );
                self.publish(provider, |s| {
                    s.is_validating = false;
                    s.is_valid = Some(false);
                    s.error = Some(err.message.clone());
                    s.last_checked = Some(Utc::now());
                });
                false
            }
        }
    }

    fn cached(&self, provider: Provider, key: &str) -> Option<bool> {
        let cache = self.cache.read();
        let entry = cache.get(&(provider, key.to_string()))?;
        if entry.checked_at.elapsed() < self.cache_ttl {
            Some(entry.is_valid)
        } else {
            None
        }
    }

    fn bump_epoch(&self, provider: Provider) -> u64 {
        let mut epochs = self.epochs.write();
        let counter = epochs.entry(provider).or_insert(0);
        *counter += 1;
        *counter
    }

    fn current_epoch(&self, provider: Provider) -> u64 {
        *self.epochs.read().get(&provider).unwrap_or(&0)
    }

    fn publish(&self, provider: Provider, update: impl FnOnce(&mut ValidationState)) {
        let mut states = self.states.write();
        update(states.entry(provider).or_default());
    }
}
