use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Local;
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_models::session::UserSession;

use crate::models::ProfileForm;
use crate::services::profile::ProfileService;

pub async fn get_profile(
    State(service): State<Arc<ProfileService>>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<Value>, AppError> {
    let profile = service.profile(&session).await;
    Ok(Json(json!(profile)))
}

pub async fn save_profile(
    State(service): State<Arc<ProfileService>>,
    Extension(session): Extension<UserSession>,
    Json(form): Json<ProfileForm>,
) -> Result<Json<Value>, AppError> {
    let saved = service.save(&session, form, Local::now().date_naive()).await?;
    Ok(Json(json!(saved.view)))
}
