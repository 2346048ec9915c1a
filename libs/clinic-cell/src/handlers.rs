use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::ClinicQuery;
use crate::services::clinic::ClinicService;

pub async fn search_clinics(
    State(service): State<Arc<ClinicService>>,
    Query(query): Query<ClinicQuery>,
) -> Result<Json<Value>, AppError> {
    let search = service.search(query).await?;
    Ok(Json(json!(search)))
}
