use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, delete},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::session_middleware;

use crate::handlers;
use crate::services::history::MedicalHistoryService;

pub fn history_routes(config: Arc<AppConfig>, service: Arc<MedicalHistoryService>) -> Router {
    Router::new()
        .route("/", get(handlers::get_history))
        .route("/records", post(handlers::add_record))
        .route("/documents/image", post(handlers::upload_image))
        .route("/{kind}/{index}", delete(handlers::delete_record))
        .layer(middleware::from_fn_with_state(config, session_middleware))
        .with_state(service)
}
