pub mod audit;
pub mod dispatcher;
pub mod notification;

pub use audit::{AuditSink, InMemoryAuditLog};
pub use dispatcher::EventDispatcher;
pub use notification::{InMemoryNotificationInbox, NotificationSender, TracingNotificationSender};
