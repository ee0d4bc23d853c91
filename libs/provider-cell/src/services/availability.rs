// libs/provider-cell/src/services/availability.rs
//
// Normalizes the identity store's availability field into a WeeklySchedule.
// Nothing past this module sees the raw text or map forms.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::Weekday;
use regex::Regex;
use tracing::debug;

use shared_models::{TimeOfDay, TimeRange};

use crate::models::{ProviderError, RawAvailability, WeeklySchedule};

static RANGE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d{1,2}(?::\d{2})?\s*(?:[ap]\.?m\.?)?)\s*(?:-|–|to)\s*(\d{1,2}(?::\d{2})?\s*(?:[ap]\.?m\.?)?)\s*$").ok()
});

static CLOCK_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d{1,2})(?::(\d{2}))?\s*(?:([ap])\.?m\.?)?$").ok());

const UNAVAILABLE_MARKERS: [&str; 5] = ["not available", "unavailable", "closed", "off", "none"];

/// Converts either upstream availability shape into a weekly schedule.
pub fn normalize_availability(raw: &RawAvailability) -> Result<WeeklySchedule, ProviderError> {
    match raw {
        RawAvailability::Weekly(days) => schedule_from_map(days),
        RawAvailability::Text(text) => {
            // The web client stores the weekday map JSON-encoded inside the string.
            if let Ok(days) = serde_json::from_str::<HashMap<String, String>>(text) {
                debug!("Availability text decoded as weekday map with {} entries", days.len());
                return schedule_from_map(&days);
            }

            match parse_working_hours(text)? {
                Some(window) => Ok(WeeklySchedule::every_day(window)),
                None => Ok(WeeklySchedule::new()),
            }
        }
    }
}

/// Parses a single working-hours entry such as `9:00 AM - 5:00 PM` or
/// `8:00 - 17:00`. Returns `Ok(None)` for explicit "not available" markers.
pub fn parse_working_hours(text: &str) -> Result<Option<TimeRange>, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || UNAVAILABLE_MARKERS.contains(&trimmed.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }

    let captures = RANGE_PATTERN
        .as_ref()
        .and_then(|re| re.captures(trimmed))
        .ok_or_else(|| ProviderError::InvalidAvailability(format!("unrecognized hours '{}'", trimmed)))?;

    let start = parse_clock(&captures[1])?;
    let end = parse_clock(&captures[2])?;

    TimeRange::new(start, end)
        .map(Some)
        .map_err(|e| ProviderError::InvalidAvailability(e.to_string()))
}

fn schedule_from_map(days: &HashMap<String, String>) -> Result<WeeklySchedule, ProviderError> {
    let mut schedule = WeeklySchedule::new();

    for (key, hours) in days {
        let weekday: Weekday = key
            .trim()
            .parse()
            .map_err(|_| ProviderError::InvalidAvailability(format!("unknown weekday '{}'", key)))?;
        schedule.set(weekday, parse_working_hours(hours)?);
    }

    Ok(schedule)
}

fn parse_clock(text: &str) -> Result<TimeOfDay, ProviderError> {
    let invalid = || ProviderError::InvalidAvailability(format!("invalid clock time '{}'", text.trim()));
    let captures = CLOCK_PATTERN
        .as_ref()
        .and_then(|re| re.captures(text.trim()))
        .ok_or_else(invalid)?;

    let mut hour: u32 = captures[1].parse().map_err(|_| invalid())?;
    let minute: u32 = match captures.get(2) {
        Some(m) => m.as_str().parse().map_err(|_| invalid())?,
        None => 0,
    };

    if let Some(meridiem) = captures.get(3) {
        if hour == 0 || hour > 12 {
            return Err(invalid());
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("p");
        hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
    }

    TimeOfDay::from_hm(hour, minute).ok_or_else(invalid)
}
