use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    pub slot_minutes: u32,
    pub default_day_start_hour: u32,
    pub default_day_end_hour: u32,
    pub utc_offset_minutes: i32,
    pub operation_timeout_ms: u64,
    pub lock_retry_attempts: u32,
    pub dispatch_queue_capacity: usize,
    pub uploads_dir: String,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_minutes: 30,
            default_day_start_hour: 8,
            default_day_end_hour: 17,
            utc_offset_minutes: 0,
            operation_timeout_ms: 5_000,
            lock_retry_attempts: 3,
            dispatch_queue_capacity: 1024,
            uploads_dir: "uploads".to_string(),
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            slot_minutes: env_or("SCHEDULING_SLOT_MINUTES", defaults.slot_minutes),
            default_day_start_hour: env_or("SCHEDULING_DAY_START_HOUR", defaults.default_day_start_hour),
            default_day_end_hour: env_or("SCHEDULING_DAY_END_HOUR", defaults.default_day_end_hour),
            utc_offset_minutes: env_or("SCHEDULING_UTC_OFFSET_MINUTES", defaults.utc_offset_minutes),
            operation_timeout_ms: env_or("SCHEDULING_OPERATION_TIMEOUT_MS", defaults.operation_timeout_ms),
            lock_retry_attempts: env_or("SCHEDULING_LOCK_RETRY_ATTEMPTS", defaults.lock_retry_attempts),
            dispatch_queue_capacity: env_or("SCHEDULING_DISPATCH_QUEUE_CAPACITY", defaults.dispatch_queue_capacity),
            uploads_dir: env::var("SCHEDULING_UPLOADS_DIR").unwrap_or_else(|_| {
                debug!("SCHEDULING_UPLOADS_DIR not set, using default");
                defaults.uploads_dir.clone()
            }),
        };

        if !config.is_valid() {
            warn!("Scheduling configuration is inconsistent - falling back to defaults");
            return defaults;
        }

        config
    }

    pub fn is_valid(&self) -> bool {
        self.slot_minutes > 0
            && self.slot_minutes <= 24 * 60
            && self.default_day_start_hour < self.default_day_end_hour
            && self.default_day_end_hour <= 24
            && self.utc_offset_minutes.abs() < 24 * 60
            && self.lock_retry_attempts > 0
            && self.dispatch_queue_capacity > 0
    }

    /// Default per-operation deadline; zero disables it.
    pub fn operation_timeout(&self) -> Option<Duration> {
        if self.operation_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.operation_timeout_ms))
        }
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => {
            debug!("{} not set, using default {}", key, default);
            default
        }
    }
}
