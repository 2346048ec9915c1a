use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_models::session::UserSession;

use crate::models::{ImageUpload, RecordForm, RecordKind};
use crate::services::history::MedicalHistoryService;

pub async fn get_history(
    State(service): State<Arc<MedicalHistoryService>>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<Value>, AppError> {
    let history = service.history(&session).await;
    Ok(Json(json!(history)))
}

pub async fn add_record(
    State(service): State<Arc<MedicalHistoryService>>,
    Extension(session): Extension<UserSession>,
    Json(form): Json<RecordForm>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let committed = service.add_record(&session, form).await?;
    let history = service.history(&session).await;

    Ok((StatusCode::CREATED, Json(json!({
        "kind": committed.value,
        "history": history,
    }))))
}

pub async fn upload_image(
    State(service): State<Arc<MedicalHistoryService>>,
    Extension(session): Extension<UserSession>,
    Json(upload): Json<ImageUpload>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let committed = service.upload_image(&session, upload).await?;
    Ok((StatusCode::CREATED, Json(json!(committed.value))))
}

pub async fn delete_record(
    State(service): State<Arc<MedicalHistoryService>>,
    Extension(session): Extension<UserSession>,
    Path((kind, index)): Path<(String, usize)>,
) -> Result<Json<Value>, AppError> {
    let kind: RecordKind = kind.parse().map_err(AppError::BadRequest)?;

    service.delete_record(&session, kind, index).await?;
    let history = service.history(&session).await;
    Ok(Json(json!(history)))
}
