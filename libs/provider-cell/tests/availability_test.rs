use std::collections::HashMap;

use assert_matches::assert_matches;
use chrono::{NaiveDate, Weekday};
use serde_json::json;
use uuid::Uuid;

use provider_cell::{
    normalize_availability, parse_working_hours, ProviderError, RawAvailability, UserProfile, UserRecord,
    WeeklySchedule,
};
use shared_models::{TimeOfDay, TimeRange, UserRole};

fn window(start: &str, end: &str) -> TimeRange {
    TimeRange::new(start.parse::<TimeOfDay>().unwrap(), end.parse::<TimeOfDay>().unwrap()).unwrap()
}

#[test]
fn test_parses_twelve_hour_ranges() {
    assert_eq!(parse_working_hours("9:00 AM - 5:00 PM").unwrap(), Some(window("09:00", "17:00")));
    assert_eq!(parse_working_hours("12:00 PM - 4:00 PM").unwrap(), Some(window("12:00", "16:00")));
    assert_eq!(parse_working_hours("8:00 am to 12:00 pm").unwrap(), Some(window("08:00", "12:00")));
}

#[test]
fn test_parses_twenty_four_hour_ranges() {
    assert_eq!(parse_working_hours("8:00 - 17:00").unwrap(), Some(window("08:00", "17:00")));
    assert_eq!(parse_working_hours("13:00-17:30").unwrap(), Some(window("13:00", "17:30")));
    assert_eq!(parse_working_hours("9 - 16").unwrap(), Some(window("09:00", "16:00")));
}

#[test]
fn test_unavailable_markers_mean_no_hours() {
    for marker in ["Not Available", "closed", "", "  OFF "] {
        assert_eq!(parse_working_hours(marker).unwrap(), None, "{marker:?}");
    }
}

#[test]
fn test_garbage_and_inverted_hours_are_rejected() {
    assert_matches!(parse_working_hours("whenever"), Err(ProviderError::InvalidAvailability(_)));
    assert_matches!(parse_working_hours("5:00 PM - 9:00 AM"), Err(ProviderError::InvalidAvailability(_)));
    assert_matches!(parse_working_hours("13:00 PM - 14:00 PM"), Err(ProviderError::InvalidAvailability(_)));
}

#[test]
fn test_weekday_map_is_normalized() {
    let mut days = HashMap::new();
    days.insert("monday".to_string(), "9:00 AM - 5:00 PM".to_string());
    days.insert("Tue".to_string(), "8:00 - 12:00".to_string());
    days.insert("saturday".to_string(), "Not Available".to_string());

    let schedule = normalize_availability(&RawAvailability::Weekly(days)).unwrap();

    assert_eq!(schedule.hours_on(Weekday::Mon), Some(window("09:00", "17:00")));
    assert_eq!(schedule.hours_on(Weekday::Tue), Some(window("08:00", "12:00")));
    assert_eq!(schedule.hours_on(Weekday::Sat), None);
    assert_eq!(schedule.hours_on(Weekday::Wed), None);
    assert_eq!(schedule.working_days(), 2);
}

#[test]
fn test_json_encoded_map_inside_text_is_decoded() {
    let encoded = json!({ "friday": "1:00 PM - 5:00 PM" }).to_string();
    let schedule = normalize_availability(&RawAvailability::Text(encoded)).unwrap();

    assert_eq!(schedule.hours_on(Weekday::Fri), Some(window("13:00", "17:00")));
    assert_eq!(schedule.working_days(), 1);
}

#[test]
fn test_plain_text_range_applies_to_every_day() {
    let schedule = normalize_availability(&RawAvailability::Text("10:00 - 14:00".into())).unwrap();
    assert_eq!(schedule, WeeklySchedule::every_day(window("10:00", "14:00")));
}

#[test]
fn test_unknown_weekday_is_rejected() {
    let mut days = HashMap::new();
    days.insert("someday".to_string(), "9:00 - 17:00".to_string());

    assert_matches!(
        normalize_availability(&RawAvailability::Weekly(days)),
        Err(ProviderError::InvalidAvailability(_))
    );
}

#[test]
fn test_record_normalization_from_both_shapes() {
    let structured: UserRecord = serde_json::from_value(json!({
        "id": Uuid::new_v4(),
        "role": "doctor",
        "firstName": "Ada",
        "lastName": "Okafor",
        "email": "ada@clinic.test",
        "department": "Cardiology",
        "professionalProfile": {
            "telehealth": true,
            "availability": { "monday": "9:00 AM - 1:00 PM" }
        }
    }))
    .unwrap();

    let textual: UserRecord = serde_json::from_value(json!({
        "_id": Uuid::new_v4(),
        "role": "doctor",
        "firstName": "Lin",
        "lastName": "Hart",
        "professionalProfile": {
            "availability": "{\"monday\":\"9:00 AM - 1:00 PM\"}"
        }
    }))
    .unwrap();

    let a = UserProfile::from_record(structured).unwrap();
    let b = UserProfile::from_record(textual).unwrap();

    assert_eq!(a.role, UserRole::Doctor);
    assert!(a.supports_telehealth());
    assert!(!b.supports_telehealth());
    assert_eq!(
        a.professional.as_ref().unwrap().availability,
        b.professional.as_ref().unwrap().availability
    );
}

#[test]
fn test_working_hours_resolution() {
    let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    let tuesday = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
    let default_window = TimeRange::hours(8, 17).unwrap();

    let mut profile = UserProfile {
        id: Uuid::new_v4(),
        role: UserRole::Doctor,
        first_name: "Sam".into(),
        last_name: "Reyes".into(),
        email: None,
        department: None,
        professional: None,
    };

    // Never configured: clinic default every day.
    assert_eq!(profile.working_hours_on(tuesday, default_window), Some(default_window));

    profile.professional = Some(provider_cell::ProfessionalProfile {
        availability: Some(WeeklySchedule::new().with_day(Weekday::Mon, window("10:00", "12:00"))),
        ..Default::default()
    });

    assert_eq!(profile.working_hours_on(monday, default_window), Some(window("10:00", "12:00")));
    assert_eq!(profile.working_hours_on(tuesday, default_window), None);
}

#[test]
fn test_unknown_role_is_rejected() {
    let record: UserRecord = serde_json::from_value(json!({
        "id": Uuid::new_v4(),
        "role": "janitor",
        "firstName": "Pat",
        "lastName": "Doe"
    }))
    .unwrap();

    assert_matches!(UserProfile::from_record(record), Err(ProviderError::UnknownRole(_)));
}
