// Profile Cell - personal details, emergency contacts and the family/medical profile
pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{
    EmergencyContact,
    FamilyHistoryEntry,
    MedicalProfile,
    PersonalDetails,
    ProfileForm,
    ProfileView,
    TimelinePrediction,
};

pub use router::profile_routes;
pub use services::profile::ProfileService;
