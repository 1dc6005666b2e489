pub mod availability;
pub mod booking;
pub mod conflict;
pub mod store;
pub mod workflow;

pub use availability::{compute_available_slots, AvailabilityService};
pub use booking::BookingService;
pub use conflict::has_conflict;
pub use store::{ScheduleStore, SupabaseScheduleStore};
pub use workflow::{BookingState, BookingWorkflow};
