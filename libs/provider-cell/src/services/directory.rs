use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::{StoreError, UserRole};

use crate::models::{ProviderError, UserProfile, UserRecord};

/// Read-only view of the identity/profile store.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError>;

    async fn find_providers_in_department(&self, department: &str) -> Result<Vec<Uuid>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryProfileDirectory {
    users: RwLock<HashMap<Uuid, UserProfile>>,
}

impl InMemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: UserProfile) {
        debug!("Registering {} profile {}", profile.role, profile.id);
        self.users.write().await.insert(profile.id, profile);
    }

    /// Normalizes and stores a raw record, rejecting malformed availability.
    pub async fn insert_record(&self, record: UserRecord) -> Result<UserProfile, ProviderError> {
        let profile = UserProfile::from_record(record)?;
        self.insert(profile.clone()).await;
        Ok(profile)
    }

    pub async fn remove(&self, id: Uuid) -> Option<UserProfile> {
        self.users.write().await.remove(&id)
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryProfileDirectory {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_providers_in_department(&self, department: &str) -> Result<Vec<Uuid>, StoreError> {
        let users = self.users.read().await;
        let mut ids: Vec<Uuid> = users
            .values()
            .filter(|u| u.role == UserRole::Doctor)
            .filter(|u| u.department.as_deref().is_some_and(|d| d.eq_ignore_ascii_case(department)))
            .map(|u| u.id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}
