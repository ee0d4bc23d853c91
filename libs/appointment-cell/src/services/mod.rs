pub mod attachments;
pub mod availability;
pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod locking;
pub mod notices;
pub mod store;

pub use attachments::{AttachmentStorage, FsAttachmentStorage};
pub use availability::AvailabilityCalculator;
pub use booking::AppointmentBookingService;
pub use conflict::ConflictDetectionService;
pub use lifecycle::{AppointmentLifecycleService, TransitionTrigger};
pub use locking::{DayGuard, DayKey, SchedulingLockManager};
pub use notices::{build_notifications, format_date, Notice, Parties};
pub use store::{AppointmentStore, InMemoryAppointmentStore};
