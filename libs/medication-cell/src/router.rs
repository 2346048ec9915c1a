use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::session_middleware;

use crate::handlers;
use crate::services::medication::MedicationService;

pub fn medication_routes(config: Arc<AppConfig>, service: Arc<MedicationService>) -> Router {
    Router::new()
        .route("/", get(handlers::list_medications).post(handlers::add_medication))
        .route("/schedule", get(handlers::get_schedule))
        .route("/schedule/upcoming", get(handlers::get_upcoming))
        .route("/summary", get(handlers::get_summary))
        .route(
            "/{id}",
            get(handlers::get_medication)
                .put(handlers::edit_medication)
                .delete(handlers::delete_medication),
        )
        .layer(middleware::from_fn_with_state(config, session_middleware))
        .with_state(service)
}
