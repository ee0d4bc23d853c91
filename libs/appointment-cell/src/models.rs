// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use provider_cell::ProviderError;
use shared_models::{Actor, StoreError, TimeOfDay, TimeRange};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub status: AppointmentStatus,
    pub is_virtual: bool,
    pub meeting_link: Option<String>,
    pub reason: String,
    pub notes: Option<String>,
    pub attachments: Vec<String>,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Occupied interval, `[start_time, end_time)`.
    pub fn time_range(&self) -> Result<TimeRange, AppointmentError> {
        TimeRange::new(self.start_time, self.end_time).map_err(|e| AppointmentError::Validation(e.to_string()))
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time.as_naive())
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Patients and providers may only touch their own appointments; staff may touch any.
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        match actor {
            Actor::Patient { id } => *id == self.patient_id,
            Actor::Provider { id } => *id == self.provider_id,
            Actor::Staff { .. } => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    Rescheduled,
}

impl AppointmentStatus {
    /// Active appointments occupy calendar time.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Rescheduled => "rescheduled",
        };
        f.write_str(name)
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            "rescheduled" => Ok(AppointmentStatus::Rescheduled),
            other => Err(AppointmentError::Validation(format!("Invalid appointment status: {}", other))),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub reason: String,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentDetails {
    pub reason: Option<String>,
    pub notes: Option<String>,
    /// Appended to the existing attachments.
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub status: Option<AppointmentStatus>,
    pub provider_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub department: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// Store-level filter. Every present field must match; date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    pub provider_ids: Option<Vec<Uuid>>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.patient_id.is_none_or(|id| id == appointment.patient_id)
            && self
                .provider_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&appointment.provider_id))
            && self.status.is_none_or(|s| s == appointment.status)
            && self.from_date.is_none_or(|d| appointment.date >= d)
            && self.to_date.is_none_or(|d| appointment.date <= d)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConflictCheckRequest {
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointment: Option<Appointment>,
    pub overlap: Option<OverlapKind>,
}

/// How a proposed interval meets an existing one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverlapKind {
    /// Proposed start lies inside the existing interval.
    StartsInside,
    /// Proposed end lies inside the existing interval.
    EndsInside,
    /// Proposed interval covers the existing one.
    Encloses,
}

impl fmt::Display for OverlapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OverlapKind::StartsInside => "starts inside",
            OverlapKind::EndsInside => "ends inside",
            OverlapKind::Encloses => "encloses",
        };
        f.write_str(text)
    }
}

/// Who is calling and by when the call must have committed.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub actor: Actor,
    pub deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor, deadline: None }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Requested slot overlaps appointment {conflicting_id} ({overlap})")]
    Conflict { conflicting_id: Uuid, overlap: OverlapKind },

    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Appointment store is unavailable")]
    Store(#[from] StoreError),

    #[error("Operation deadline exceeded")]
    DeadlineExceeded,
}

impl AppointmentError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        AppointmentError::NotFound { entity, id }
    }

    /// Store failures and deadlines may succeed on retry; everything else is a
    /// caller-input problem.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppointmentError::Store(_) | AppointmentError::DeadlineExceeded)
    }
}

impl From<ProviderError> for AppointmentError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Store(e) => AppointmentError::Store(e),
            other => AppointmentError::Validation(other.to_string()),
        }
    }
}
