// libs/provider-cell/src/models.rs
use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::{StoreError, TimeRange, UserRole};

use crate::services::availability::normalize_availability;

// ==============================================================================
// NORMALIZED PROFILE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub professional: Option<ProfessionalProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProfessionalProfile {
    pub telehealth: bool,
    pub accepting_new_patients: bool,
    /// `None` means the provider never configured hours.
    pub availability: Option<WeeklySchedule>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_provider(&self) -> bool {
        self.role == UserRole::Doctor
    }

    pub fn supports_telehealth(&self) -> bool {
        self.professional.as_ref().is_some_and(|p| p.telehealth)
    }

    /// Working window for `date`.
    ///
    /// A provider without any configured schedule works the clinic default
    /// window every day; a configured schedule with no entry for the weekday
    /// means no hours that day.
    pub fn working_hours_on(&self, date: NaiveDate, default_window: TimeRange) -> Option<TimeRange> {
        match self.professional.as_ref().and_then(|p| p.availability.as_ref()) {
            Some(schedule) => schedule.hours_on(date.weekday()),
            None => Some(default_window),
        }
    }

    /// Normalizes a raw identity-store record.
    pub fn from_record(record: UserRecord) -> Result<Self, ProviderError> {
        let role: UserRole = record
            .role
            .parse()
            .map_err(|_| ProviderError::UnknownRole(record.role.clone()))?;

        let professional = match record.professional_profile {
            Some(raw) => Some(ProfessionalProfile {
                telehealth: raw.telehealth.unwrap_or(false),
                accepting_new_patients: raw.accepting_new_patients.unwrap_or(true),
                availability: raw.availability.as_ref().map(normalize_availability).transpose()?,
            }),
            None => None,
        };

        Ok(Self {
            id: record.id,
            role,
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
            department: record.department,
            professional,
        })
    }
}

/// Per-weekday working windows, indexed from Monday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    days: [Option<TimeRange>; 7],
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn every_day(window: TimeRange) -> Self {
        Self { days: [Some(window); 7] }
    }

    pub fn with_day(mut self, weekday: Weekday, window: TimeRange) -> Self {
        self.set(weekday, Some(window));
        self
    }

    pub fn set(&mut self, weekday: Weekday, window: Option<TimeRange>) {
        self.days[weekday.num_days_from_monday() as usize] = window;
    }

    pub fn hours_on(&self, weekday: Weekday) -> Option<TimeRange> {
        self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn working_days(&self) -> usize {
        self.days.iter().filter(|d| d.is_some()).count()
    }
}

// ==============================================================================
// RAW IDENTITY-STORE RECORDS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(alias = "_id")]
    pub id: Uuid,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub professional_profile: Option<RawProfessionalProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfessionalProfile {
    pub availability: Option<RawAvailability>,
    pub telehealth: Option<bool>,
    pub accepting_new_patients: Option<bool>,
}

/// Availability as persisted upstream: either free text (possibly a
/// JSON-encoded weekday map) or a weekday map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawAvailability {
    Text(String),
    Weekly(HashMap<String, String>),
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Invalid availability: {0}")]
    InvalidAvailability(String),

    #[error("Unknown user role: {0}")]
    UnknownRole(String),

    #[error("Slot granularity must be positive, got {0} minutes")]
    InvalidGranularity(u32),

    #[error("Directory error: {0}")]
    Store(#[from] StoreError),
}
