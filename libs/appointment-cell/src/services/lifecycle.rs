// libs/appointment-cell/src/services/lifecycle.rs
use chrono::NaiveDateTime;
use tracing::{debug, warn};

use shared_models::Actor;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// What asked for the transition. `Rescheduled` is only reachable by moving
/// the appointment, never by a plain status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTrigger {
    StatusUpdate,
    Reschedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActorKind {
    Patient,
    Provider,
    Staff,
}

impl From<&Actor> for ActorKind {
    fn from(actor: &Actor) -> Self {
        match actor {
            Actor::Patient { .. } => ActorKind::Patient,
            Actor::Provider { .. } => ActorKind::Provider,
            Actor::Staff { .. } => ActorKind::Staff,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Get all valid next statuses for a given current status and trigger
    pub fn valid_transitions(&self, from: AppointmentStatus, trigger: TransitionTrigger) -> Vec<AppointmentStatus> {
        use AppointmentStatus::*;

        match (trigger, from) {
            (TransitionTrigger::StatusUpdate, Pending) => vec![Confirmed, Cancelled],
            (TransitionTrigger::StatusUpdate, Confirmed) => vec![Cancelled, Completed],
            (TransitionTrigger::StatusUpdate, Rescheduled) => vec![Confirmed, Cancelled, Completed],
            (TransitionTrigger::Reschedule, Pending | Confirmed | Rescheduled) => vec![Rescheduled],
            // Terminal states
            (_, Cancelled | Completed) => vec![],
        }
    }

    pub fn is_legal(&self, from: AppointmentStatus, to: AppointmentStatus, trigger: TransitionTrigger) -> bool {
        self.valid_transitions(from, trigger).contains(&to)
    }

    /// Whether the actor's role may move any appointment into `to`.
    fn role_permits(&self, actor: &Actor, to: AppointmentStatus) -> bool {
        let kind = ActorKind::from(actor);
        match to {
            AppointmentStatus::Confirmed | AppointmentStatus::Completed => {
                matches!(kind, ActorKind::Provider | ActorKind::Staff)
            }
            AppointmentStatus::Cancelled => true,
            AppointmentStatus::Rescheduled => matches!(kind, ActorKind::Patient | ActorKind::Provider),
            AppointmentStatus::Pending => false,
        }
    }

    /// Full transition check against one appointment, in order: ownership,
    /// table legality, role permission, timing.
    ///
    /// `clinic_now` is the clinic's local wall-clock time; an appointment can
    /// only be completed once its start is not in the future.
    pub fn authorize_transition(
        &self,
        appointment: &Appointment,
        to: AppointmentStatus,
        trigger: TransitionTrigger,
        actor: &Actor,
        clinic_now: NaiveDateTime,
    ) -> Result<(), AppointmentError> {
        debug!(
            "Validating transition {} -> {} ({:?}) on {} by {}",
            appointment.status, to, trigger, appointment.id, actor
        );

        if !appointment.is_visible_to(actor) {
            warn!("{} does not own appointment {}", actor, appointment.id);
            return Err(AppointmentError::Unauthorized(
                "Not authorized to update this appointment".to_string(),
            ));
        }

        if !self.is_legal(appointment.status, to, trigger) {
            warn!("Illegal status transition attempted: {} -> {}", appointment.status, to);
            return Err(AppointmentError::IllegalTransition { from: appointment.status, to });
        }

        if !self.role_permits(actor, to) {
            warn!("{} may not move appointment {} to {}", actor, appointment.id, to);
            let reason = match to {
                AppointmentStatus::Confirmed => "Only providers or staff can confirm appointments",
                AppointmentStatus::Completed => "Only providers or staff can mark appointments as completed",
                AppointmentStatus::Rescheduled => "Only the patient or provider can reschedule an appointment",
                _ => "Not authorized to update this appointment",
            };
            return Err(AppointmentError::Unauthorized(reason.to_string()));
        }

        if to == AppointmentStatus::Completed && appointment.starts_at() > clinic_now {
            warn!("Appointment {} starts at {}, cannot complete yet", appointment.id, appointment.starts_at());
            return Err(AppointmentError::Validation(
                "Cannot complete an appointment that has not started".to_string(),
            ));
        }

        Ok(())
    }
}
