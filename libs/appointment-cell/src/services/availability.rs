use tracing::debug;

use provider_cell::SlotGenerator;
use shared_models::TimeOfDay;

use crate::models::Appointment;

/// Filters generated slots down to bookable start times.
#[derive(Debug, Default, Clone, Copy)]
pub struct AvailabilityCalculator;

impl AvailabilityCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Removes every slot that lies inside an active booking, plus the final
    /// generated slot, which has no following slot to end on.
    pub fn available_slots(&self, generator: &SlotGenerator, bookings: &[Appointment]) -> Vec<TimeOfDay> {
        let candidates = generator.slots();
        let last_index = candidates.len().saturating_sub(1);

        let blocking: Vec<&Appointment> = bookings.iter().filter(|a| a.is_active()).collect();

        let available: Vec<TimeOfDay> = candidates
            .enumerate()
            .filter(|(index, _)| *index != last_index)
            .filter(|(_, slot)| {
                !blocking
                    .iter()
                    .any(|a| a.start_time <= *slot && *slot < a.end_time)
            })
            .map(|(_, slot)| slot)
            .collect();

        debug!(
            "{} of {} slots available in {} ({} blocking bookings)",
            available.len(),
            generator.slots().len(),
            generator.window(),
            blocking.len()
        );

        available
    }
}
