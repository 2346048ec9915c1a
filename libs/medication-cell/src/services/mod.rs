pub mod medication;
pub mod schedule;

pub use medication::MedicationService;
pub use schedule::{ScheduleBuilder, TimeOfDayParser};
