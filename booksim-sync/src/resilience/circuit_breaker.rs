//! Per-dependency circuit breaker.
//!
//! Closed → (threshold consecutive failures) → Open → (cooldown elapsed) →
//! HalfOpen → success closes, failure re-opens.
//!
//! While half-open only one probe is in flight. A probe that never reports
//! back is replaced by a new one after another cooldown.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use booksim_core::CircuitBreakerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum Entry {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen { probe_since: Instant },
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.failure_threshold, Duration::from_secs(config.cooldown_secs))
    }

    /// Whether a call against `key` may proceed. An open circuit whose
    /// cooldown has elapsed moves to half-open and lets exactly one probe
    /// through; callers arriving while that probe is out are refused.
    pub fn allow(&self, key: &str) -> bool {
        let mut entries = self.entries();
        match entries.get(key).copied() {
            None | Some(Entry::Closed { .. }) => true,
            Some(Entry::Open { since }) | Some(Entry::HalfOpen { probe_since: since })
                if since.elapsed() >= self.cooldown =>
            {
                tracing::info!(key, "circuit half-open, allowing probe");
                entries.insert(
                    key.to_string(),
                    Entry::HalfOpen {
                        probe_since: Instant::now(),
                    },
                );
                true
            }
            Some(Entry::Open { .. }) | Some(Entry::HalfOpen { .. }) => false,
        }
    }

    pub fn record_success(&self, key: &str) {
        let previous = self
            .entries()
            .insert(key.to_string(), Entry::Closed { failures: 0 });
        if matches!(previous, Some(Entry::HalfOpen { .. })) {
            tracing::info!(key, "circuit closed");
        }
    }

    pub fn record_failure(&self, key: &str) {
        let mut entries = self.entries();
        let next = match entries.get(key).copied() {
            None => Entry::Closed { failures: 1 },
            Some(Entry::Closed { failures }) => Entry::Closed {
                failures: failures + 1,
            },
            Some(Entry::HalfOpen { .. }) | Some(Entry::Open { .. }) => Entry::Open {
                since: Instant::now(),
            },
        };
        let next = match next {
            Entry::Closed { failures } if failures >= self.failure_threshold => {
                tracing::warn!(key, failures, "circuit opened");
                Entry::Open {
                    since: Instant::now(),
                }
            }
            other => other,
        };
        entries.insert(key.to_string(), next);
    }

    pub fn state(&self, key: &str) -> BreakerState {
        match self.entries().get(key) {
            None | Some(Entry::Closed { .. }) => BreakerState::Closed,
            Some(Entry::Open { .. }) => BreakerState::Open,
            Some(Entry::HalfOpen { .. }) => BreakerState::HalfOpen,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::from_config(&CircuitBreakerConfig::default())
    }
}
