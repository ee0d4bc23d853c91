use thiserror::Error;
use uuid::Uuid;

/// Failure reported by a persistence collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Record already exists: {0}")]
    Duplicate(Uuid),

    #[error("Record missing: {0}")]
    Missing(Uuid),
}
