#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::*;
use dispatch_cell::{EventDispatcher, InMemoryAuditLog, InMemoryNotificationInbox};
use provider_cell::{InMemoryProfileDirectory, ProfessionalProfile, UserProfile, WeeklySchedule};
use shared_config::SchedulingConfig;
use shared_models::{Actor, FixedClock, TimeOfDay, UserRole};

pub fn t(raw: &str) -> TimeOfDay {
    raw.parse().unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Saturday 2024-06-01, the date used by most scenarios.
pub fn booking_day() -> NaiveDate {
    day(2024, 6, 1)
}

/// Clock pinned to 2024-06-01 12:00 UTC.
pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()))
}

pub fn profile(role: UserRole, first: &str, last: &str) -> UserProfile {
    UserProfile {
        id: Uuid::new_v4(),
        role,
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: None,
        department: None,
        professional: None,
    }
}

pub fn provider_profile(last: &str, telehealth: bool, availability: Option<WeeklySchedule>) -> UserProfile {
    let mut provider = profile(UserRole::Doctor, "Dana", last);
    provider.department = Some("Cardiology".to_string());
    provider.professional = Some(ProfessionalProfile {
        telehealth,
        accepting_new_patients: true,
        availability,
    });
    provider
}

pub fn appointment(provider_id: Uuid, date: NaiveDate, start: &str, end: &str, status: AppointmentStatus) -> Appointment {
    let now = Utc::now();
    let patient_id = Uuid::new_v4();
    Appointment {
        id: Uuid::new_v4(),
        patient_id,
        provider_id,
        date,
        start_time: t(start),
        end_time: t(end),
        status,
        is_virtual: false,
        meeting_link: None,
        reason: "Check-up".to_string(),
        notes: None,
        attachments: Vec::new(),
        created_by: patient_id,
        updated_by: None,
        created_at: now,
        updated_at: now,
    }
}

pub struct Harness {
    pub service: AppointmentBookingService,
    pub store: Arc<InMemoryAppointmentStore>,
    pub directory: Arc<InMemoryProfileDirectory>,
    pub inbox: InMemoryNotificationInbox,
    pub audit_log: InMemoryAuditLog,
    pub dispatcher: EventDispatcher,
    pub patient: UserProfile,
    pub other_patient: UserProfile,
    pub provider: UserProfile,
    pub telehealth_provider: UserProfile,
    pub nurse: UserProfile,
    pub admin: UserProfile,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(SchedulingConfig::default()).await
    }

    pub async fn with_config(config: SchedulingConfig) -> Self {
        let store = Arc::new(InMemoryAppointmentStore::new());
        Self::with_store(config, store.clone(), store).await
    }

    /// `store` backs the service; `inspect` is the same data without any
    /// wrapping, for assertions.
    pub async fn with_store(
        config: SchedulingConfig,
        store: Arc<dyn AppointmentStore>,
        inspect: Arc<InMemoryAppointmentStore>,
    ) -> Self {
        let directory = Arc::new(InMemoryProfileDirectory::new());
        let inbox = InMemoryNotificationInbox::new();
        let audit_log = InMemoryAuditLog::new();
        let dispatcher = EventDispatcher::spawn(
            Arc::new(inbox.clone()),
            Arc::new(audit_log.clone()),
            config.dispatch_queue_capacity,
        );

        let patient = profile(UserRole::Patient, "Jamie", "Lee");
        let other_patient = profile(UserRole::Patient, "Robin", "Moss");
        let provider = provider_profile("Okafor", false, None);
        let telehealth_provider = provider_profile("Hart", true, None);
        let nurse = profile(UserRole::Nurse, "Kim", "Park");
        let admin = profile(UserRole::Admin, "Alex", "Stone");

        for user in [&patient, &other_patient, &provider, &telehealth_provider, &nurse, &admin] {
            directory.insert(user.clone()).await;
        }

        let service = AppointmentBookingService::new(config, store, directory.clone(), dispatcher.clone())
            .with_clock(fixed_clock());

        Self {
            service,
            store: inspect,
            directory,
            inbox,
            audit_log,
            dispatcher,
            patient,
            other_patient,
            provider,
            telehealth_provider,
            nurse,
            admin,
        }
    }

    pub fn as_patient(&self) -> RequestContext {
        RequestContext::new(Actor::patient(self.patient.id))
    }

    pub fn as_provider(&self) -> RequestContext {
        RequestContext::new(Actor::provider(self.provider.id))
    }

    pub fn as_nurse(&self) -> RequestContext {
        RequestContext::new(Actor::nurse(self.nurse.id))
    }

    pub fn as_admin(&self) -> RequestContext {
        RequestContext::new(Actor::admin(self.admin.id))
    }

    pub fn booking(&self, date: NaiveDate, start: &str, end: &str) -> BookAppointmentRequest {
        BookAppointmentRequest {
            patient_id: self.patient.id,
            provider_id: self.provider.id,
            date,
            start_time: t(start),
            end_time: t(end),
            reason: "Follow-up".to_string(),
            is_virtual: false,
            notes: None,
            attachments: Vec::new(),
        }
    }

    pub async fn book(&self, date: NaiveDate, start: &str, end: &str) -> Appointment {
        self.service
            .create_appointment(&self.as_patient(), self.booking(date, start, end))
            .await
            .unwrap()
    }

    /// Stores an appointment for the harness patient and provider directly,
    /// bypassing the orchestrator.
    pub async fn seed(&self, date: NaiveDate, start: &str, end: &str, status: AppointmentStatus) -> Appointment {
        let mut seeded = appointment(self.provider.id, date, start, end, status);
        seeded.patient_id = self.patient.id;
        seeded.created_by = self.patient.id;
        self.store.insert(seeded.clone()).await.unwrap();
        seeded
    }

    pub async fn stored(&self, id: Uuid) -> Appointment {
        self.store.find_by_id(id).await.unwrap().unwrap()
    }
}
