// libs/appointment-cell/src/services/notices.rs
//
// Notification wording for appointment events. Each message goes to the
// counter-party of whoever acted; staff actions reach both sides.

use chrono::NaiveDate;
use uuid::Uuid;

use dispatch_cell::Notification;
use provider_cell::UserProfile;
use shared_models::{Actor, TimeOfDay};

use crate::models::{Appointment, AppointmentStatus};

/// Display names used in notification text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parties {
    pub patient_name: String,
    pub provider_last_name: String,
}

impl Parties {
    pub fn from_profiles(patient: &UserProfile, provider: &UserProfile) -> Self {
        Self {
            patient_name: patient.full_name(),
            provider_last_name: provider.last_name.clone(),
        }
    }
}

impl Default for Parties {
    fn default() -> Self {
        Self {
            patient_name: "your patient".to_string(),
            provider_last_name: "your provider".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Requested,
    StatusChanged(AppointmentStatus),
    Rescheduled {
        from_date: NaiveDate,
        from_time: TimeOfDay,
    },
    MeetingLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Audience {
    Patient,
    Provider,
}

fn audiences(actor: &Actor) -> &'static [Audience] {
    match actor {
        Actor::Patient { .. } => &[Audience::Provider],
        Actor::Provider { .. } => &[Audience::Patient],
        Actor::Staff { .. } => &[Audience::Patient, Audience::Provider],
    }
}

/// Renders a date like "Saturday, June 1, 2024".
pub fn format_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

pub fn build_notifications(appointment: &Appointment, notice: Notice, actor: &Actor, parties: &Parties) -> Vec<Notification> {
    audiences(actor)
        .iter()
        .map(|audience| {
            let recipient = recipient(appointment, *audience);
            let (title, message) = compose(appointment, notice, *audience, parties);
            Notification::appointment(recipient, appointment.id, title, message)
        })
        .collect()
}

fn recipient(appointment: &Appointment, audience: Audience) -> Uuid {
    match audience {
        Audience::Patient => appointment.patient_id,
        Audience::Provider => appointment.provider_id,
    }
}

fn compose(appointment: &Appointment, notice: Notice, audience: Audience, parties: &Parties) -> (String, String) {
    let when = format!("{} at {}", format_date(appointment.date), appointment.start_time);
    let kind = if appointment.is_virtual { "telehealth appointment" } else { "appointment" };
    let doctor = format!("Dr. {}", parties.provider_last_name);
    let patient = &parties.patient_name;
    let with_article = if appointment.is_virtual { "a telehealth appointment" } else { "an appointment" };

    match (notice, audience) {
        (Notice::Requested, Audience::Provider) => (
            "New Appointment Request".to_string(),
            format!("{} has requested {} on {}.", patient, with_article, when),
        ),
        (Notice::Requested, Audience::Patient) => (
            "Appointment Requested".to_string(),
            format!("Your request for {} with {} on {} has been received.", with_article, doctor, when),
        ),
        (Notice::StatusChanged(status), audience) => status_message(status, audience, kind, &when, &doctor, patient, appointment),
        (Notice::Rescheduled { from_date, from_time }, Audience::Patient) => (
            "Appointment Rescheduled".to_string(),
            format!(
                "Your {} with {} on {} at {} has been rescheduled to {}.",
                kind,
                doctor,
                format_date(from_date),
                from_time,
                when
            ),
        ),
        (Notice::Rescheduled { from_date, from_time }, Audience::Provider) => (
            "Appointment Rescheduled".to_string(),
            format!(
                "The {} with {} on {} at {} has been rescheduled to {}.",
                kind,
                patient,
                format_date(from_date),
                from_time,
                when
            ),
        ),
        (Notice::MeetingLink, Audience::Patient) => (
            "Meeting Link Updated".to_string(),
            format!("A meeting link has been added to your telehealth appointment with {} on {}.", doctor, when),
        ),
        (Notice::MeetingLink, Audience::Provider) => (
            "Meeting Link Updated".to_string(),
            format!("The meeting link for your telehealth appointment with {} on {} was updated.", patient, when),
        ),
    }
}

fn status_message(
    status: AppointmentStatus,
    audience: Audience,
    kind: &str,
    when: &str,
    doctor: &str,
    patient: &str,
    appointment: &Appointment,
) -> (String, String) {
    let title = match (status, appointment.is_virtual, audience) {
        (AppointmentStatus::Confirmed, true, Audience::Provider) => "Telehealth Appointment Confirmed",
        (AppointmentStatus::Confirmed, _, _) => "Appointment Confirmed",
        (AppointmentStatus::Cancelled, _, _) => "Appointment Cancelled",
        (AppointmentStatus::Completed, _, _) => "Appointment Completed",
        (AppointmentStatus::Rescheduled, _, _) => "Appointment Rescheduled",
        (AppointmentStatus::Pending, _, _) => "Appointment Updated",
    };

    let message = match audience {
        Audience::Patient => format!("Your {} with {} on {} has been {}.", kind, doctor, when, status),
        Audience::Provider => format!("The {} with {} on {} has been {}.", kind, patient, when, status),
    };

    (title.to_string(), message)
}
