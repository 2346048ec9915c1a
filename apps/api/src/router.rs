use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use clinic_cell::{clinic_routes, ClinicService};
use medical_history_cell::{history_routes, MedicalHistoryService};
use medication_cell::api::MedicationService;
use medication_cell::medication_routes;
use profile_cell::{profile_routes, ProfileService};
use shared_config::AppConfig;
use shared_database::SyncContext;

pub fn create_router(config: Arc<AppConfig>, sync: SyncContext) -> Router {
    let medications = Arc::new(MedicationService::new(sync.clone()));
    let history = Arc::new(MedicalHistoryService::new(sync.clone()));
    let profile = Arc::new(ProfileService::new(sync));
    let clinics = Arc::new(ClinicService::new(&config));

    Router::new()
        .route("/", get(|| async { "Medilink API is running!" }))
        .nest("/medications", medication_routes(config.clone(), medications))
        .nest("/history", history_routes(config.clone(), history))
        .nest("/profile", profile_routes(config.clone(), profile))
        .nest("/clinics", clinic_routes(config, clinics))
}
