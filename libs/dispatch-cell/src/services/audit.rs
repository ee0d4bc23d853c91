use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::{AuditAction, AuditRecord};

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditRecord) -> Result<(), DispatchError>;
}

/// Append-only audit trail held in memory. Every entry is also emitted as a
/// structured log line.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<AuditRecord>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditRecord> {
        self.entries.read().await.clone()
    }

    pub async fn for_target(&self, performed_on: Uuid) -> Vec<AuditRecord> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.performed_on == performed_on)
            .cloned()
            .collect()
    }

    fn log_to_tracing(entry: &AuditRecord) {
        match entry.action {
            AuditAction::AppointmentPurged => info!(
                audit_id = %entry.id,
                action = %entry.action,
                performed_by = %entry.performed_by,
                performed_on = %entry.performed_on,
                "AUDIT: {}", entry.details
            ),
            _ => debug!(
                audit_id = %entry.id,
                action = %entry.action,
                performed_by = %entry.performed_by,
                performed_on = %entry.performed_on,
                "AUDIT: {}", entry.details
            ),
        }
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn record(&self, entry: AuditRecord) -> Result<(), DispatchError> {
        Self::log_to_tracing(&entry);
        self.entries.write().await.push(entry);
        Ok(())
    }
}
