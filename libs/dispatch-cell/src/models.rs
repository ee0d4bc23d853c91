use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ==============================================================================
// NOTIFICATIONS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Appointment,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_appointment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn appointment(
        recipient_id: Uuid,
        appointment_id: Uuid,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            title: title.into(),
            message: message.into(),
            kind: NotificationKind::Appointment,
            related_appointment_id: Some(appointment_id),
            created_at: Utc::now(),
        }
    }
}

// ==============================================================================
// AUDIT RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    AppointmentCreated,
    AppointmentStatusUpdated,
    AppointmentRescheduled,
    AppointmentDetailsUpdated,
    MeetingLinkUpdated,
    AppointmentPurged,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditAction::AppointmentCreated => "appointment_created",
            AuditAction::AppointmentStatusUpdated => "appointment_status_updated",
            AuditAction::AppointmentRescheduled => "appointment_rescheduled",
            AuditAction::AppointmentDetailsUpdated => "appointment_details_updated",
            AuditAction::MeetingLinkUpdated => "meeting_link_updated",
            AuditAction::AppointmentPurged => "appointment_purged",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditRecord {
    pub id: Uuid,
    pub action: AuditAction,
    pub performed_by: Uuid,
    pub performed_on: Uuid,
    pub previous_value: Option<Value>,
    pub new_value: Option<Value>,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(action: AuditAction, performed_by: Uuid, performed_on: Uuid, details: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            performed_by,
            performed_on,
            previous_value: None,
            new_value: None,
            details: details.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_values(mut self, previous: Option<Value>, new: Option<Value>) -> Self {
        self.previous_value = previous;
        self.new_value = new;
        self
    }
}

/// Side effects of one committed appointment mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentEvent {
    pub appointment_id: Uuid,
    pub notifications: Vec<Notification>,
    pub audit: AuditRecord,
}
