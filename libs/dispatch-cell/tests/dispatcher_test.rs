use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use mockall::mock;
use uuid::Uuid;

use dispatch_cell::*;

mock! {
    pub Sender {}

    #[async_trait]
    impl NotificationSender for Sender {
        async fn send(&self, notification: Notification) -> Result<(), DispatchError>;
    }
}

mock! {
    pub Sink {}

    #[async_trait]
    impl AuditSink for Sink {
        async fn record(&self, entry: AuditRecord) -> Result<(), DispatchError>;
    }
}

fn event(recipients: &[Uuid]) -> AppointmentEvent {
    let appointment_id = Uuid::new_v4();
    AppointmentEvent {
        appointment_id,
        notifications: recipients
            .iter()
            .map(|r| Notification::appointment(*r, appointment_id, "Appointment Confirmed", "See you soon"))
            .collect(),
        audit: AuditRecord::new(AuditAction::AppointmentStatusUpdated, Uuid::new_v4(), appointment_id, "confirmed"),
    }
}

#[tokio::test]
async fn test_events_reach_inbox_and_audit_log() {
    let inbox = InMemoryNotificationInbox::new();
    let log = InMemoryAuditLog::new();
    let dispatcher = EventDispatcher::spawn(Arc::new(inbox.clone()), Arc::new(log.clone()), 16);

    let patient = Uuid::new_v4();
    let provider = Uuid::new_v4();
    let sent = event(&[patient, provider]);
    let appointment_id = sent.appointment_id;

    dispatcher.dispatch(sent).await.unwrap();
    dispatcher.flush().await.unwrap();

    assert_eq!(inbox.for_recipient(patient).await.len(), 1);
    assert_eq!(inbox.for_recipient(provider).await.len(), 1);
    assert_eq!(inbox.all().await.len(), 2);

    let entries = log.for_target(appointment_id).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::AppointmentStatusUpdated);
}

#[tokio::test]
async fn test_failed_delivery_does_not_block_later_work() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut sender = MockSender::new();
    sender.expect_send().times(3).returning(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(DispatchError::Delivery("smtp down".into()))
        } else {
            Ok(())
        }
    });

    let mut sink = MockSink::new();
    sink.expect_record().times(2).returning(|_| Ok(()));

    let dispatcher = EventDispatcher::spawn(Arc::new(sender), Arc::new(sink), 16);

    dispatcher.dispatch(event(&[Uuid::new_v4(), Uuid::new_v4()])).await.unwrap();
    dispatcher.dispatch(event(&[Uuid::new_v4()])).await.unwrap();
    dispatcher.flush().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_audit_failure_is_swallowed() {
    let mut sender = MockSender::new();
    sender.expect_send().returning(|_| Ok(()));

    let mut sink = MockSink::new();
    sink.expect_record()
        .times(2)
        .returning(|_| Err(DispatchError::Audit("disk full".into())));

    let dispatcher = EventDispatcher::spawn(Arc::new(sender), Arc::new(sink), 4);

    dispatcher.dispatch(event(&[Uuid::new_v4()])).await.unwrap();
    dispatcher.dispatch(event(&[])).await.unwrap();
    assert_matches!(dispatcher.flush().await, Ok(()));
}

/// Notification sender that takes a while per message.
struct SlowSender {
    delay: Duration,
    inbox: InMemoryNotificationInbox,
}

#[async_trait]
impl NotificationSender for SlowSender {
    async fn send(&self, notification: Notification) -> Result<(), DispatchError> {
        tokio::time::sleep(self.delay).await;
        self.inbox.send(notification).await
    }
}

#[tokio::test]
async fn test_full_queue_waits_instead_of_dropping() {
    let inbox = InMemoryNotificationInbox::new();
    let log = InMemoryAuditLog::new();
    let sender = SlowSender {
        delay: Duration::from_millis(50),
        inbox: inbox.clone(),
    };
    let dispatcher = EventDispatcher::spawn(Arc::new(sender), Arc::new(log.clone()), 1);

    for _ in 0..4 {
        assert_matches!(dispatcher.dispatch(event(&[Uuid::new_v4()])).await, Ok(()));
    }
    dispatcher.flush().await.unwrap();

    assert_eq!(inbox.all().await.len(), 4);
    assert_eq!(log.entries().await.len(), 4);
}

#[test]
fn test_audit_actions_serialize_snake_case() {
    let json = serde_json::to_string(&AuditAction::MeetingLinkUpdated).unwrap();
    assert_eq!(json, "\"meeting_link_updated\"");
    assert_eq!(AuditAction::AppointmentPurged.to_string(), "appointment_purged");
}
