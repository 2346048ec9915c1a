// Clinic Cell - nearby clinics and hospitals from a public point-of-interest service
pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{Clinic, ClinicQuery, ClinicSearch, GeoPoint};
pub use router::clinic_routes;
pub use services::clinic::ClinicService;
