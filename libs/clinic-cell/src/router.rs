use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::session_middleware;

use crate::handlers;
use crate::services::clinic::ClinicService;

pub fn clinic_routes(config: Arc<AppConfig>, service: Arc<ClinicService>) -> Router {
    Router::new()
        .route("/", get(handlers::search_clinics))
        .layer(middleware::from_fn_with_state(config, session_middleware))
        .with_state(service)
}
