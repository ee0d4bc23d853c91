use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Audit write failed: {0}")]
    Audit(String),

    #[error("Dispatch worker has stopped")]
    QueueClosed,
}
