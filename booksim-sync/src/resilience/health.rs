//! Last-known health of the external dependency.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Unknown,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub message: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct HealthMonitor {
    snapshot: Mutex<HealthSnapshot>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(HealthSnapshot {
                status: HealthStatus::Unknown,
                message: None,
                checked_at: None,
            }),
        }
    }

    pub fn record_up(&self) {
        self.set(HealthStatus::Up, None);
    }

    pub fn record_down(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(message = %message, "external dependency down");
        self.set(HealthStatus::Down, Some(message));
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, status: HealthStatus, message: Option<String>) {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        *snapshot = HealthSnapshot {
            status,
            message,
            checked_at: Some(Utc::now()),
        };
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unknown_and_tracks_latest() {
        let monitor = HealthMonitor::new();
        assert_eq!(monitor.snapshot().status, HealthStatus::Unknown);

        monitor.record_down("connection refused");
        let down = monitor.snapshot();
        assert_eq!(down.status, HealthStatus::Down);
        assert_eq!(down.message.as_deref(), Some("connection refused"));

        monitor.record_up();
        let up = monitor.snapshot();
        assert_eq!(up.status, HealthStatus::Up);
        assert!(up.message.is_none());
        assert!(up.checked_at.is_some());
    }
}
