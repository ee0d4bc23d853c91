use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::Notification;

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), DispatchError>;
}

/// Writes notifications to the log and nowhere else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationSender;

#[async_trait]
impl NotificationSender for TracingNotificationSender {
    async fn send(&self, notification: Notification) -> Result<(), DispatchError> {
        info!(
            notification_id = %notification.id,
            recipient_id = %notification.recipient_id,
            appointment_id = ?notification.related_appointment_id,
            "NOTIFY: {}", notification.title
        );
        Ok(())
    }
}

/// Keeps every delivered notification, queryable per recipient.
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationInbox {
    delivered: Arc<RwLock<Vec<Notification>>>,
}

impl InMemoryNotificationInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Notification> {
        self.delivered.read().await.clone()
    }

    pub async fn for_recipient(&self, recipient_id: Uuid) -> Vec<Notification> {
        self.delivered
            .read()
            .await
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationSender for InMemoryNotificationInbox {
    async fn send(&self, notification: Notification) -> Result<(), DispatchError> {
        self.delivered.write().await.push(notification);
        Ok(())
    }
}
