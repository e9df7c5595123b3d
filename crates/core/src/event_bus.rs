//! Notification sink: fire-and-forget delivery of compliance reports and
//! alert batches.
//!
//! The engine and the monitoring manager accept an `Arc<dyn NotificationSink>`;
//! delivery is never awaited and no response is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A full compliance report at the end of a validation pass.
    ComplianceReport,
    /// Immediate batch of critical failures from the real-time path.
    CriticalAlert,
    /// A monitoring check scored below a guardian's alert threshold.
    GuardianAlert,
    /// Repeated guardian alerts crossed the escalation threshold.
    Escalation,
    AutoFixSummary,
}

/// A single message handed to a [`NotificationSink`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub brand_id: String,
    pub title: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        brand_id: impl Into<String>,
        title: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            brand_id: brand_id.into(),
            title: title.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// No-op sink for tests and callers that don't need delivery.
pub struct NoOpSink;

impl NotificationSink for NoOpSink {
    fn notify(&self, _notification: Notification) {}
}

/// Sink that writes every notification to the tracing pipeline.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        info!(
            id = %notification.id,
            kind = ?notification.kind,
            brand_id = %notification.brand_id,
            title = %notification.title,
            "notification dispatched"
        );
    }
}

/// In-memory sink that captures notifications for testing.
#[derive(Default)]
pub struct CaptureSink {
    notifications: Mutex<Vec<Notification>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .clone()
    }

    pub fn count(&self) -> usize {
        self.notifications
            .lock()
            .len()
    }

    pub fn count_kind(&self, kind: NotificationKind) -> usize {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }

    pub fn clear(&self) {
        self.notifications
            .lock()
            .clear();
    }
}

impl NotificationSink for CaptureSink {
    fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .push(notification);
    }
}

/// Convenience: a sink that drops everything.
pub fn noop_sink() -> Arc<dyn NotificationSink> {
    Arc::new(NoOpSink)
}

/// Convenience: create a capture sink for tests.
pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
