// libs/appointment-cell/src/services/locking.rs
//
// Serializes read-check-write sequences per (provider, date). Operations on
// different providers, or on different days of the same provider, never
// contend. A day's entry lives only while someone holds or awaits its lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

pub type DayKey = (Uuid, NaiveDate);

type Registry = Arc<Mutex<HashMap<DayKey, Arc<AsyncMutex<()>>>>>;

/// Holds one or more provider-day locks until dropped.
pub struct DayGuard {
    keys: Vec<DayKey>,
    guards: Vec<OwnedMutexGuard<()>>,
    registry: Registry,
}

impl DayGuard {
    pub fn keys(&self) -> &[DayKey] {
        &self.keys
    }
}

impl Drop for DayGuard {
    fn drop(&mut self) {
        self.guards.clear();

        let mut locks = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        for key in &self.keys {
            // Only the registry's own handle left: nobody holds or awaits it.
            if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(key);
            }
        }
    }
}

#[derive(Default)]
pub struct SchedulingLockManager {
    locks: Registry,
}

impl SchedulingLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires every requested day lock. Keys are sorted and de-duplicated
    /// first so that two callers locking overlapping sets cannot deadlock.
    pub async fn lock_days<I>(&self, keys: I) -> DayGuard
    where
        I: IntoIterator<Item = DayKey>,
    {
        let mut keys: Vec<DayKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        // Built up front so a cancelled acquisition still prunes its entries.
        let mut day_guard = DayGuard {
            guards: Vec::with_capacity(keys.len()),
            keys,
            registry: Arc::clone(&self.locks),
        };

        for index in 0..day_guard.keys.len() {
            let key = day_guard.keys[index];
            let lock = self.entry(key);
            let guard = lock.lock_owned().await;
            day_guard.guards.push(guard);
            debug!("Acquired scheduling lock for provider {} on {}", key.0, key.1);
        }

        day_guard
    }

    pub async fn lock_day(&self, provider_id: Uuid, date: NaiveDate) -> DayGuard {
        self.lock_days([(provider_id, date)]).await
    }

    /// Number of provider-days currently held or awaited.
    pub fn tracked_days(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn entry(&self, key: DayKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }
}
