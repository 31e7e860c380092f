//! Notification sink — the fire-and-forget collaborator for reminders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Events the engine pushes at users. Delivery transport (websocket push,
/// SMS, mail) is external; the engine only emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NoticeEvent {
    /// The lease ends within the reminder lookahead.
    LeaseExpiring {
        order_id: i64,
        end_time: DateTime<Utc>,
    },
}

/// Fire-and-forget delivery. Implementations swallow and log their own
/// transport failures; a reminder that cannot be delivered never fails a
/// sweep.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user_id: i64, event: NoticeEvent);
}

/// Discards everything.
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn notify(&self, _user_id: i64, _event: NoticeEvent) {}
}

/// Records deliveries for assertions in tests.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<(i64, NoticeEvent)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn delivered(&self) -> Vec<(i64, NoticeEvent)> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, user_id: i64, event: NoticeEvent) {
        self.delivered.lock().await.push((user_id, event));
    }
}
