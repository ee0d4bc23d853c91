use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::{TimeOfDay, TimeRange};

use crate::models::{Appointment, OverlapKind};

/// Pure overlap checks over a provider's bookings for one day.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConflictDetectionService;

impl ConflictDetectionService {
    pub fn new() -> Self {
        Self
    }

    /// Classifies how `proposed` meets `[existing_start, existing_end)`.
    /// Every overlap of two half-open intervals falls under exactly one shape;
    /// touching endpoints do not overlap.
    pub fn classify(&self, proposed: TimeRange, existing_start: TimeOfDay, existing_end: TimeOfDay) -> Option<OverlapKind> {
        let (start, end) = (proposed.start(), proposed.end());

        if existing_start <= start && start < existing_end {
            Some(OverlapKind::StartsInside)
        } else if existing_start < end && end <= existing_end {
            Some(OverlapKind::EndsInside)
        } else if start <= existing_start && existing_end <= end && existing_start < existing_end {
            Some(OverlapKind::Encloses)
        } else {
            None
        }
    }

    /// First active appointment of `provider_id` on `date` that overlaps
    /// `proposed`, skipping `exclude`.
    pub fn find_conflict<'a>(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        proposed: TimeRange,
        exclude: Option<Uuid>,
        existing: &'a [Appointment],
    ) -> Option<(&'a Appointment, OverlapKind)> {
        debug!(
            "Checking {} for provider {} on {} against {} bookings",
            proposed,
            provider_id,
            date,
            existing.len()
        );

        let conflict = existing
            .iter()
            .filter(|a| a.provider_id == provider_id && a.date == date)
            .filter(|a| a.is_active())
            .filter(|a| Some(a.id) != exclude)
            .find_map(|a| self.classify(proposed, a.start_time, a.end_time).map(|kind| (a, kind)));

        if let Some((appointment, kind)) = conflict {
            warn!(
                "Conflict detected for provider {} on {}: {} {} appointment {}",
                provider_id, date, proposed, kind, appointment.id
            );
        }

        conflict
    }
}
