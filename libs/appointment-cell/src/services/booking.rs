// libs/appointment-cell/src/services/booking.rs
use std::future::Future;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use dispatch_cell::{AppointmentEvent, AuditAction, AuditRecord, EventDispatcher};
use provider_cell::{ProfileDirectory, SlotGenerator, UserProfile};
use shared_config::SchedulingConfig;
use shared_models::{Actor, Clock, StoreError, SystemClock, TimeOfDay, TimeRange, UserRole};

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentListQuery, AppointmentSearchQuery,
    AppointmentStatus, BookAppointmentRequest, ConflictCheckRequest, ConflictCheckResponse, RequestContext,
    RescheduleAppointmentRequest, UpdateAppointmentDetails,
};
use crate::services::attachments::{AttachmentStorage, FsAttachmentStorage};
use crate::services::availability::AvailabilityCalculator;
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::{AppointmentLifecycleService, TransitionTrigger};
use crate::services::locking::{DayGuard, SchedulingLockManager};
use crate::services::notices::{build_notifications, Notice, Parties};
use crate::services::store::AppointmentStore;

/// Books, moves and transitions appointments.
///
/// Every mutation runs its read-check-write sequence while holding the
/// provider-day lock(s) it touches. The caller's deadline bounds everything up
/// to the store write; once the write starts it runs to completion, so a
/// timeout never leaves a partial change behind. Notifications and audit
/// records are queued only after the write has committed, and the call does
/// not return until its event is queued.
pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    directory: Arc<dyn ProfileDirectory>,
    attachments: Arc<dyn AttachmentStorage>,
    dispatcher: EventDispatcher,
    clock: Arc<dyn Clock>,
    locks: SchedulingLockManager,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    availability_calculator: AvailabilityCalculator,
    config: SchedulingConfig,
}

impl AppointmentBookingService {
    pub fn new(
        config: SchedulingConfig,
        store: Arc<dyn AppointmentStore>,
        directory: Arc<dyn ProfileDirectory>,
        dispatcher: EventDispatcher,
    ) -> Self {
        let attachments = Arc::new(FsAttachmentStorage::new(&config.uploads_dir));

        Self {
            store,
            directory,
            attachments,
            dispatcher,
            clock: Arc::new(SystemClock),
            locks: SchedulingLockManager::new(),
            conflict_service: ConflictDetectionService::new(),
            lifecycle_service: AppointmentLifecycleService::new(),
            availability_calculator: AvailabilityCalculator::new(),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_attachment_storage(mut self, attachments: Arc<dyn AttachmentStorage>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    pub fn locks(&self) -> &SchedulingLockManager {
        &self.locks
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    /// Bookable start times for a provider on a date. A day without working
    /// hours yields an empty list.
    #[instrument(skip(self))]
    pub async fn compute_available_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeOfDay>, AppointmentError> {
        let deadline = self.deadline(None);

        self.before_deadline(deadline, "compute_available_slots", async {
            let provider = self.provider_profile(provider_id).await?;

            let Some(generator) = self.slot_generator(&provider, date)? else {
                debug!("Provider {} has no working hours on {}", provider_id, date);
                return Ok(Vec::new());
            };

            let bookings = self
                .store
                .find_by_provider_and_date(provider_id, date)
                .await
                .map_err(store_failure)?;

            Ok(self.availability_calculator.available_slots(&generator, &bookings))
        })
        .await
    }

    /// Diagnostic overlap check. Takes no lock, so the answer may be stale by
    /// the time the caller books.
    #[instrument(skip(self, request), fields(provider_id = %request.provider_id))]
    pub async fn check_conflicts(&self, request: ConflictCheckRequest) -> Result<ConflictCheckResponse, AppointmentError> {
        let proposed = validated_range(request.start_time, request.end_time)?;

        let existing = self
            .store
            .find_by_provider_and_date(request.provider_id, request.date)
            .await
            .map_err(store_failure)?;

        let conflict = self.conflict_service.find_conflict(
            request.provider_id,
            request.date,
            proposed,
            request.exclude_appointment_id,
            &existing,
        );

        Ok(ConflictCheckResponse {
            has_conflict: conflict.is_some(),
            conflicting_appointment: conflict.map(|(a, _)| a.clone()),
            overlap: conflict.map(|(_, kind)| kind),
        })
    }

    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub async fn get_appointment(&self, ctx: &RequestContext, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let deadline = self.deadline(ctx.deadline);
        let appointment = self
            .before_deadline(deadline, "get_appointment", self.load(appointment_id))
            .await?;

        if !appointment.is_visible_to(&ctx.actor) {
            warn!("{} attempted to view appointment {}", ctx.actor, appointment_id);
            return Err(AppointmentError::Unauthorized(
                "Not authorized to view this appointment".to_string(),
            ));
        }

        Ok(appointment)
    }

    /// A user's appointments ordered by date and start time. Patients may only
    /// list their own; providers and staff may list anyone's.
    #[instrument(skip(self, ctx, query), fields(actor = %ctx.actor))]
    pub async fn list_user_appointments(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        query: AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if matches!(ctx.actor, Actor::Patient { id } if id != user_id) {
            warn!("{} attempted to list appointments of {}", ctx.actor, user_id);
            return Err(AppointmentError::Unauthorized(
                "Not authorized to view these appointments".to_string(),
            ));
        }

        let deadline = self.deadline(ctx.deadline);
        self.before_deadline(deadline, "list_user_appointments", async {
            let user = self
                .directory
                .find_user(user_id)
                .await
                .map_err(store_failure)?
                .ok_or(AppointmentError::not_found("User", user_id))?;

            let mut filter = AppointmentFilter {
                status: query.status,
                from_date: query.from_date,
                to_date: query.to_date,
                ..Default::default()
            };
            match user.role {
                UserRole::Patient => filter.patient_id = Some(user_id),
                UserRole::Doctor => filter.provider_ids = Some(vec![user_id]),
                UserRole::Nurse | UserRole::Admin => {}
            }

            self.store.search(&filter).await.map_err(store_failure)
        })
        .await
    }

    /// Staff-only search across all appointments.
    #[instrument(skip(self, ctx, query), fields(actor = %ctx.actor))]
    pub async fn search_appointments(
        &self,
        ctx: &RequestContext,
        query: AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if !ctx.actor.is_staff() {
            warn!("{} attempted an appointment search", ctx.actor);
            return Err(AppointmentError::Unauthorized(
                "Not authorized to access this resource".to_string(),
            ));
        }

        let deadline = self.deadline(ctx.deadline);
        self.before_deadline(deadline, "search_appointments", async {
            let provider_ids = match (&query.department, query.provider_id) {
                (Some(department), provider_id) => {
                    let mut ids = self
                        .directory
                        .find_providers_in_department(department)
                        .await
                        .map_err(store_failure)?;
                    if let Some(provider_id) = provider_id {
                        ids.retain(|id| *id == provider_id);
                    }
                    debug!("Department '{}' resolved to {} providers", department, ids.len());
                    Some(ids)
                }
                (None, Some(provider_id)) => Some(vec![provider_id]),
                (None, None) => None,
            };

            let filter = AppointmentFilter {
                patient_id: query.patient_id,
                provider_ids,
                status: query.status,
                from_date: query.from_date,
                to_date: query.to_date,
            };

            self.store.search(&filter).await.map_err(store_failure)
        })
        .await
    }

    // ==========================================================================
    // MUTATIONS
    // ==========================================================================

    #[instrument(skip(self, ctx, request), fields(actor = %ctx.actor, provider_id = %request.provider_id, date = %request.date))]
    pub async fn create_appointment(
        &self,
        ctx: &RequestContext,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let proposed = self.validate_booking_input(&ctx.actor, &request)?;
        let deadline = self.deadline(ctx.deadline);

        let (appointment, parties, guard) = self
            .before_deadline(deadline, "create_appointment", async {
                let provider = self.provider_profile(request.provider_id).await?;
                let patient = self.patient_profile(request.patient_id).await?;

                if request.is_virtual && !provider.supports_telehealth() {
                    warn!("Provider {} does not offer telehealth", provider.id);
                    return Err(AppointmentError::Validation(
                        "Selected provider does not support telehealth appointments".to_string(),
                    ));
                }

                self.validate_slot(&provider, request.date, proposed)?;

                let guard = self.locks.lock_day(request.provider_id, request.date).await;
                self.ensure_slot_free(request.provider_id, request.date, proposed, None).await?;

                let now = self.clock.now();
                let appointment = Appointment {
                    id: Uuid::new_v4(),
                    patient_id: request.patient_id,
                    provider_id: request.provider_id,
                    date: request.date,
                    start_time: request.start_time,
                    end_time: request.end_time,
                    status: AppointmentStatus::Pending,
                    is_virtual: request.is_virtual,
                    meeting_link: None,
                    reason: request.reason.trim().to_string(),
                    notes: request.notes.clone(),
                    attachments: request.attachments.clone(),
                    created_by: ctx.actor.id(),
                    updated_by: None,
                    created_at: now,
                    updated_at: now,
                };

                Ok((appointment, Parties::from_profiles(&patient, &provider), guard))
            })
            .await?;

        self.store.insert(appointment.clone()).await.map_err(store_failure)?;
        drop(guard);

        info!(
            "Appointment {} booked with provider {} on {} at {}",
            appointment.id, appointment.provider_id, appointment.date, appointment.start_time
        );

        let audit = AuditRecord::new(
            AuditAction::AppointmentCreated,
            ctx.actor.id(),
            appointment.id,
            "Appointment created",
        )
        .with_values(None, serde_json::to_value(&appointment).ok());
        self.publish(&appointment, Some(Notice::Requested), &ctx.actor, &parties, audit).await;

        Ok(appointment)
    }

    /// Moves an appointment to a new slot and marks it Rescheduled. The
    /// appointment's own current slot never counts as a conflict.
    #[instrument(skip(self, ctx, request), fields(actor = %ctx.actor))]
    pub async fn reschedule_appointment(
        &self,
        ctx: &RequestContext,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let proposed = validated_range(request.start_time, request.end_time)?;
        let deadline = self.deadline(ctx.deadline);

        let (previous, updated, guard) = self
            .before_deadline(deadline, "reschedule_appointment", async {
                let (current, guard) = self.lock_appointment(appointment_id, Some(request.date)).await?;

                self.lifecycle_service.authorize_transition(
                    &current,
                    AppointmentStatus::Rescheduled,
                    TransitionTrigger::Reschedule,
                    &ctx.actor,
                    self.clinic_now(),
                )?;

                let provider = self.provider_profile(current.provider_id).await?;
                self.validate_slot(&provider, request.date, proposed)?;
                self.ensure_slot_free(current.provider_id, request.date, proposed, Some(current.id))
                    .await?;

                let mut updated = current.clone();
                updated.date = request.date;
                updated.start_time = request.start_time;
                updated.end_time = request.end_time;
                updated.status = AppointmentStatus::Rescheduled;
                updated.meeting_link = None;
                self.stamp(&mut updated, &ctx.actor);

                Ok((current, updated, guard))
            })
            .await?;

        let updated = self.commit_update(updated, guard).await?;

        info!(
            "Appointment {} rescheduled from {} {} to {} {}",
            updated.id, previous.date, previous.start_time, updated.date, updated.start_time
        );

        let audit = AuditRecord::new(
            AuditAction::AppointmentRescheduled,
            ctx.actor.id(),
            updated.id,
            format!("Appointment moved to {} at {}", updated.date, updated.start_time),
        )
        .with_values(Some(slot_snapshot(&previous)), Some(slot_snapshot(&updated)));
        let notice = Notice::Rescheduled {
            from_date: previous.date,
            from_time: previous.start_time,
        };
        let parties = self.parties(&updated).await;
        self.publish(&updated, Some(notice), &ctx.actor, &parties, audit).await;

        Ok(updated)
    }

    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub async fn update_status(
        &self,
        ctx: &RequestContext,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let deadline = self.deadline(ctx.deadline);

        let (previous, updated, guard) = self
            .before_deadline(deadline, "update_status", async {
                let (current, guard) = self.lock_appointment(appointment_id, None).await?;

                self.lifecycle_service.authorize_transition(
                    &current,
                    new_status,
                    TransitionTrigger::StatusUpdate,
                    &ctx.actor,
                    self.clinic_now(),
                )?;

                // Rescheduled appointments do not hold their slot, so it may
                // have been taken in the meantime.
                if current.status == AppointmentStatus::Rescheduled && new_status.is_active() {
                    self.ensure_slot_free(current.provider_id, current.date, current.time_range()?, Some(current.id))
                        .await?;
                }

                let mut updated = current.clone();
                updated.status = new_status;
                if current.status == AppointmentStatus::Confirmed {
                    updated.meeting_link = None;
                }
                self.stamp(&mut updated, &ctx.actor);

                Ok((current, updated, guard))
            })
            .await?;

        let updated = self.commit_update(updated, guard).await?;

        info!("Appointment {} status {} -> {}", updated.id, previous.status, updated.status);

        let audit = AuditRecord::new(
            AuditAction::AppointmentStatusUpdated,
            ctx.actor.id(),
            updated.id,
            format!("Status changed from {} to {}", previous.status, updated.status),
        )
        .with_values(Some(json!({ "status": previous.status })), Some(json!({ "status": updated.status })));
        let parties = self.parties(&updated).await;
        self.publish(&updated, Some(Notice::StatusChanged(new_status)), &ctx.actor, &parties, audit).await;

        Ok(updated)
    }

    /// Only the owning provider may attach a link, and only to a confirmed
    /// telehealth appointment.
    #[instrument(skip(self, ctx, link), fields(actor = %ctx.actor))]
    pub async fn attach_meeting_link(
        &self,
        ctx: &RequestContext,
        appointment_id: Uuid,
        link: &str,
    ) -> Result<Appointment, AppointmentError> {
        let link = link.trim();
        if link.is_empty() {
            return Err(AppointmentError::Validation("Meeting link is required".to_string()));
        }

        let deadline = self.deadline(ctx.deadline);
        let (previous, updated, guard) = self
            .before_deadline(deadline, "attach_meeting_link", async {
                let (current, guard) = self.lock_appointment(appointment_id, None).await?;

                if ctx.actor != Actor::provider(current.provider_id) {
                    warn!("{} attempted to set the meeting link of {}", ctx.actor, appointment_id);
                    return Err(AppointmentError::Unauthorized(
                        "Not authorized to update meeting link".to_string(),
                    ));
                }
                if !current.is_virtual {
                    return Err(AppointmentError::Validation(
                        "Cannot add meeting link to non-telehealth appointment".to_string(),
                    ));
                }
                if current.status != AppointmentStatus::Confirmed {
                    return Err(AppointmentError::Validation(
                        "Can only add meeting link to confirmed appointments".to_string(),
                    ));
                }

                let mut updated = current.clone();
                updated.meeting_link = Some(link.to_string());
                self.stamp(&mut updated, &ctx.actor);

                Ok((current, updated, guard))
            })
            .await?;

        let updated = self.commit_update(updated, guard).await?;

        info!("Meeting link set for appointment {}", updated.id);

        let audit = AuditRecord::new(
            AuditAction::MeetingLinkUpdated,
            ctx.actor.id(),
            updated.id,
            "Meeting link updated",
        )
        .with_values(
            Some(json!({ "meeting_link": previous.meeting_link })),
            Some(json!({ "meeting_link": updated.meeting_link })),
        );
        let parties = self.parties(&updated).await;
        self.publish(&updated, Some(Notice::MeetingLink), &ctx.actor, &parties, audit).await;

        Ok(updated)
    }

    /// Edits the descriptive payload. New attachments are appended.
    #[instrument(skip(self, ctx, details), fields(actor = %ctx.actor))]
    pub async fn update_details(
        &self,
        ctx: &RequestContext,
        appointment_id: Uuid,
        details: UpdateAppointmentDetails,
    ) -> Result<Appointment, AppointmentError> {
        if details.reason.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(AppointmentError::Validation("Reason cannot be empty".to_string()));
        }

        let deadline = self.deadline(ctx.deadline);
        let (previous, updated, guard) = self
            .before_deadline(deadline, "update_details", async {
                let (current, guard) = self.lock_appointment(appointment_id, None).await?;

                if !current.is_visible_to(&ctx.actor) {
                    warn!("{} attempted to edit appointment {}", ctx.actor, appointment_id);
                    return Err(AppointmentError::Unauthorized(
                        "Not authorized to update this appointment".to_string(),
                    ));
                }

                let mut updated = current.clone();
                if let Some(reason) = &details.reason {
                    updated.reason = reason.trim().to_string();
                }
                if details.notes.is_some() {
                    updated.notes = details.notes.clone();
                }
                updated.attachments.extend(details.attachments.iter().cloned());
                self.stamp(&mut updated, &ctx.actor);

                Ok((current, updated, guard))
            })
            .await?;

        let updated = self.commit_update(updated, guard).await?;

        debug!("Details updated for appointment {}", updated.id);

        let audit = AuditRecord::new(
            AuditAction::AppointmentDetailsUpdated,
            ctx.actor.id(),
            updated.id,
            "Appointment details updated",
        )
        .with_values(Some(details_snapshot(&previous)), Some(details_snapshot(&updated)));
        self.publish(&updated, None, &ctx.actor, &Parties::default(), audit).await;

        Ok(updated)
    }

    /// Admin-only hard delete. Attachment files are removed best-effort after
    /// the record is gone.
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub async fn purge_appointment(&self, ctx: &RequestContext, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        if !ctx.actor.is_admin() {
            warn!("{} attempted to purge appointment {}", ctx.actor, appointment_id);
            return Err(AppointmentError::Unauthorized(
                "Not authorized to delete appointments".to_string(),
            ));
        }

        let deadline = self.deadline(ctx.deadline);
        let (_, guard) = self
            .before_deadline(deadline, "purge_appointment", self.lock_appointment(appointment_id, None))
            .await?;

        let removed = self
            .store
            .delete(appointment_id)
            .await
            .map_err(store_failure)?
            .ok_or(AppointmentError::not_found("Appointment", appointment_id))?;
        drop(guard);

        info!("Appointment {} purged", appointment_id);

        for reference in &removed.attachments {
            if let Err(e) = self.attachments.remove(reference).await {
                warn!("Attachment cleanup for appointment {} failed: {:#}", appointment_id, e);
            }
        }

        let audit = AuditRecord::new(
            AuditAction::AppointmentPurged,
            ctx.actor.id(),
            appointment_id,
            "Appointment deleted",
        )
        .with_values(serde_json::to_value(&removed).ok(), None);
        self.publish(&removed, None, &ctx.actor, &Parties::default(), audit).await;

        Ok(removed)
    }

    // ==========================================================================
    // INTERNALS
    // ==========================================================================

    fn deadline(&self, requested: Option<Instant>) -> Option<Instant> {
        requested.or_else(|| self.config.operation_timeout().map(|timeout| Instant::now() + timeout))
    }

    async fn before_deadline<T, F>(
        &self,
        deadline: Option<Instant>,
        operation: &'static str,
        phase: F,
    ) -> Result<T, AppointmentError>
    where
        F: Future<Output = Result<T, AppointmentError>>,
    {
        match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, phase).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("{} exceeded its deadline before committing", operation);
                    Err(AppointmentError::DeadlineExceeded)
                }
            },
            None => phase.await,
        }
    }

    /// The clinic's local wall-clock time.
    fn clinic_now(&self) -> NaiveDateTime {
        (self.clock.now() + ChronoDuration::minutes(i64::from(self.config.utc_offset_minutes))).naive_utc()
    }

    fn stamp(&self, appointment: &mut Appointment, actor: &Actor) {
        appointment.updated_by = Some(actor.id());
        appointment.updated_at = self.clock.now();
    }

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .find_by_id(appointment_id)
            .await
            .map_err(store_failure)?
            .ok_or(AppointmentError::not_found("Appointment", appointment_id))
    }

    /// Loads an appointment and locks its provider-day (plus `destination`,
    /// when moving it). The record is re-read under the lock; if it moved to
    /// another day in the meantime the locks are released and the attempt
    /// repeats.
    async fn lock_appointment(
        &self,
        appointment_id: Uuid,
        destination: Option<NaiveDate>,
    ) -> Result<(Appointment, DayGuard), AppointmentError> {
        let attempts = self.config.lock_retry_attempts.max(1);

        for attempt in 1..=attempts {
            let snapshot = self.load(appointment_id).await?;

            let mut days = vec![(snapshot.provider_id, snapshot.date)];
            days.extend(destination.map(|date| (snapshot.provider_id, date)));
            let guard = self.locks.lock_days(days).await;

            let current = self.load(appointment_id).await?;
            if current.provider_id == snapshot.provider_id && current.date == snapshot.date {
                return Ok((current, guard));
            }

            debug!(
                "Appointment {} moved while waiting for its lock (attempt {}/{})",
                appointment_id, attempt, attempts
            );
        }

        error!("Appointment {} kept moving after {} lock attempts", appointment_id, attempts);
        Err(AppointmentError::Store(StoreError::Unavailable(format!(
            "appointment {} changed concurrently",
            appointment_id
        ))))
    }

    async fn commit_update(&self, appointment: Appointment, guard: DayGuard) -> Result<Appointment, AppointmentError> {
        self.store.update(appointment.clone()).await.map_err(store_failure)?;
        drop(guard);
        Ok(appointment)
    }

    async fn provider_profile(&self, provider_id: Uuid) -> Result<UserProfile, AppointmentError> {
        let provider = self
            .directory
            .find_user(provider_id)
            .await
            .map_err(store_failure)?
            .ok_or(AppointmentError::not_found("Provider", provider_id))?;

        if !provider.is_provider() {
            warn!("User {} is a {}, not a provider", provider_id, provider.role);
            return Err(AppointmentError::Validation("Invalid provider ID".to_string()));
        }

        Ok(provider)
    }

    async fn patient_profile(&self, patient_id: Uuid) -> Result<UserProfile, AppointmentError> {
        let patient = self
            .directory
            .find_user(patient_id)
            .await
            .map_err(store_failure)?
            .ok_or(AppointmentError::not_found("Patient", patient_id))?;

        if patient.role != UserRole::Patient {
            return Err(AppointmentError::Validation("Invalid patient ID".to_string()));
        }

        Ok(patient)
    }

    fn slot_generator(&self, provider: &UserProfile, date: NaiveDate) -> Result<Option<SlotGenerator>, AppointmentError> {
        let default_window = TimeRange::hours(self.config.default_day_start_hour, self.config.default_day_end_hour)
            .map_err(|e| AppointmentError::Validation(format!("Invalid default working hours: {}", e)))?;

        provider
            .working_hours_on(date, default_window)
            .map(|window| SlotGenerator::new(window, self.config.slot_minutes))
            .transpose()
            .map_err(AppointmentError::from)
    }

    /// The slot must lie within the provider's hours for that day and both
    /// ends must fall on the slot grid.
    fn validate_slot(&self, provider: &UserProfile, date: NaiveDate, proposed: TimeRange) -> Result<(), AppointmentError> {
        let Some(generator) = self.slot_generator(provider, date)? else {
            return Err(AppointmentError::Validation(format!(
                "Provider does not work on {}",
                date
            )));
        };

        if !generator.window().encloses(&proposed) {
            return Err(AppointmentError::Validation(format!(
                "Requested time {} is outside working hours {}",
                proposed,
                generator.window()
            )));
        }

        if !generator.is_aligned(proposed.start()) || !generator.is_aligned(proposed.end()) {
            return Err(AppointmentError::Validation(format!(
                "Requested time {} is not aligned to {}-minute slots",
                proposed,
                generator.granularity_minutes()
            )));
        }

        Ok(())
    }

    fn validate_booking_input(&self, actor: &Actor, request: &BookAppointmentRequest) -> Result<TimeRange, AppointmentError> {
        if request.reason.trim().is_empty() {
            return Err(AppointmentError::Validation("Missing required fields: reason".to_string()));
        }

        if matches!(actor, Actor::Patient { id } if *id != request.patient_id) {
            warn!("{} attempted to book for patient {}", actor, request.patient_id);
            return Err(AppointmentError::Unauthorized(
                "Not authorized to create appointment for another patient".to_string(),
            ));
        }

        validated_range(request.start_time, request.end_time)
    }

    /// Must be called while holding the provider-day lock for `date`.
    async fn ensure_slot_free(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        proposed: TimeRange,
        exclude: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        let existing = self
            .store
            .find_by_provider_and_date(provider_id, date)
            .await
            .map_err(store_failure)?;

        match self
            .conflict_service
            .find_conflict(provider_id, date, proposed, exclude, &existing)
        {
            Some((conflicting, overlap)) => Err(AppointmentError::Conflict {
                conflicting_id: conflicting.id,
                overlap,
            }),
            None => Ok(()),
        }
    }

    /// Names for notification text. Lookup failures fall back to generic
    /// wording; the mutation has already committed.
    async fn parties(&self, appointment: &Appointment) -> Parties {
        let mut parties = Parties::default();

        match self.directory.find_user(appointment.patient_id).await {
            Ok(Some(patient)) => parties.patient_name = patient.full_name(),
            Ok(None) => {}
            Err(e) => warn!("Could not load patient {} for notification: {}", appointment.patient_id, e),
        }
        match self.directory.find_user(appointment.provider_id).await {
            Ok(Some(provider)) => parties.provider_last_name = provider.last_name,
            Ok(None) => {}
            Err(e) => warn!("Could not load provider {} for notification: {}", appointment.provider_id, e),
        }

        parties
    }

    async fn publish(&self, appointment: &Appointment, notice: Option<Notice>, actor: &Actor, parties: &Parties, audit: AuditRecord) {
        let notifications = notice
            .map(|notice| build_notifications(appointment, notice, actor, parties))
            .unwrap_or_default();

        let event = AppointmentEvent {
            appointment_id: appointment.id,
            notifications,
            audit,
        };

        if let Err(e) = self.dispatcher.dispatch(event).await {
            error!("Post-commit event for appointment {} lost: {}", appointment.id, e);
        }
    }
}

fn store_failure(err: StoreError) -> AppointmentError {
    error!("Appointment store failure: {}", err);
    AppointmentError::Store(err)
}

fn validated_range(start: TimeOfDay, end: TimeOfDay) -> Result<TimeRange, AppointmentError> {
    TimeRange::new(start, end).map_err(|e| AppointmentError::Validation(format!("Invalid appointment time: {}", e)))
}

fn slot_snapshot(appointment: &Appointment) -> serde_json::Value {
    json!({
        "date": appointment.date,
        "start_time": appointment.start_time,
        "end_time": appointment.end_time,
        "status": appointment.status,
    })
}

fn details_snapshot(appointment: &Appointment) -> serde_json::Value {
    json!({
        "reason": appointment.reason,
        "notes": appointment.notes,
        "attachments": appointment.attachments,
    })
}
