use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::session_middleware;

use crate::handlers;
use crate::services::profile::ProfileService;

pub fn profile_routes(config: Arc<AppConfig>, service: Arc<ProfileService>) -> Router {
    Router::new()
        .route("/", get(handlers::get_profile).put(handlers::save_profile))
        .layer(middleware::from_fn_with_state(config, session_middleware))
        .with_state(service)
}
