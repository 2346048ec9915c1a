// Medication Cell - medication list, derived status and the daily schedule
pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{
    Frequency,
    Medication,
    MedicationForm,
    MedicationList,
    MedicationStatus,
    MedicationSummary,
    MedicationView,
    RefillReminder,
    ScheduleEntry,
};

pub use router::medication_routes;

pub mod api {
    pub use crate::services::medication::MedicationService;
    pub use crate::services::schedule::{ScheduleBuilder, TimeOfDayParser};
}
