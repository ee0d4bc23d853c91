pub mod actor;
pub mod error;
pub mod time;

pub use actor::{Actor, StaffRole, UserRole};
pub use error::StoreError;
pub use time::{Clock, FixedClock, SystemClock, TimeOfDay, TimeRange, TimeRangeError};
