// libs/dispatch-cell/src/services/dispatcher.rs
//
// Delivers notifications and audit records after a mutation has committed.
// Delivery runs on a background task fed by a bounded queue. A full queue
// makes the caller wait for room; a failed delivery never reaches them.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::error::DispatchError;
use crate::models::AppointmentEvent;
use crate::services::audit::AuditSink;
use crate::services::notification::NotificationSender;

enum Command {
    Deliver(AppointmentEvent),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct EventDispatcher {
    sender: mpsc::Sender<Command>,
}

impl EventDispatcher {
    /// Starts the delivery worker. Must be called from within a tokio runtime.
    pub fn spawn(
        notifier: Arc<dyn NotificationSender>,
        audit: Arc<dyn AuditSink>,
        capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        tokio::spawn(run_worker(receiver, notifier, audit));
        Self { sender }
    }

    /// Queues an event, waiting for room when the queue is full. Only a
    /// stopped worker loses the event.
    pub async fn dispatch(&self, event: AppointmentEvent) -> Result<(), DispatchError> {
        let appointment_id = event.appointment_id;
        if self.sender.capacity() == 0 {
            debug!("Dispatch queue full, waiting to queue event for appointment {}", appointment_id);
        }

        self.sender.send(Command::Deliver(event)).await.map_err(|_| {
            error!("Dispatch worker stopped, dropping event for appointment {}", appointment_id);
            DispatchError::QueueClosed
        })
    }

    /// Resolves once every event queued before this call has been handled.
    pub async fn flush(&self) -> Result<(), DispatchError> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(Command::Flush(ack))
            .await
            .map_err(|_| DispatchError::QueueClosed)?;
        done.await.map_err(|_| DispatchError::QueueClosed)
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Command>,
    notifier: Arc<dyn NotificationSender>,
    audit: Arc<dyn AuditSink>,
) {
    while let Some(command) = receiver.recv().await {
        match command {
            Command::Deliver(event) => deliver(event, notifier.as_ref(), audit.as_ref()).await,
            Command::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("Dispatch worker exiting");
}

async fn deliver(event: AppointmentEvent, notifier: &dyn NotificationSender, audit: &dyn AuditSink) {
    let appointment_id = event.appointment_id;

    for notification in event.notifications {
        let recipient = notification.recipient_id;
        if let Err(e) = notifier.send(notification).await {
            warn!("Failed to notify {} about appointment {}: {}", recipient, appointment_id, e);
        }
    }

    let action = event.audit.action;
    if let Err(e) = audit.record(event.audit).await {
        error!("Failed to record {} audit for appointment {}: {}", action, appointment_id, e);
    }
}
