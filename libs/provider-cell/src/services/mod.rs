pub mod availability;
pub mod directory;
pub mod slots;

pub use availability::{normalize_availability, parse_working_hours};
pub use directory::{InMemoryProfileDirectory, ProfileDirectory};
pub use slots::{SlotGenerator, Slots};
