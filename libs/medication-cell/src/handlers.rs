use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Local, Timelike};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::error::AppError;
use shared_models::session::UserSession;

use crate::models::{MedicationForm, UpcomingQuery};
use crate::services::medication::MedicationService;

pub async fn list_medications(
    State(service): State<Arc<MedicationService>>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<Value>, AppError> {
    let medications = service.list(&session).await;
    Ok(Json(json!({ "medications": medications })))
}

pub async fn get_medication(
    State(service): State<Arc<MedicationService>>,
    Extension(session): Extension<UserSession>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let medication = service.get(&session, id).await?;
    Ok(Json(json!(medication)))
}

pub async fn add_medication(
    State(service): State<Arc<MedicationService>>,
    Extension(session): Extension<UserSession>,
    Json(form): Json<MedicationForm>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let committed = service.add(&session, form).await?;
    Ok((StatusCode::CREATED, Json(json!(committed.value))))
}

pub async fn edit_medication(
    State(service): State<Arc<MedicationService>>,
    Extension(session): Extension<UserSession>,
    Path(id): Path<i64>,
    Json(form): Json<MedicationForm>,
) -> Result<Json<Value>, AppError> {
    let committed = service.edit(&session, id, form).await?;
    Ok(Json(json!(committed.value)))
}

pub async fn delete_medication(
    State(service): State<Arc<MedicationService>>,
    Extension(session): Extension<UserSession>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    service.delete(&session, id).await?;
    Ok(Json(json!({ "deleted": id })))
}

pub async fn get_schedule(
    State(service): State<Arc<MedicationService>>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<Value>, AppError> {
    let schedule = service.schedule(&session).await;
    Ok(Json(json!({ "schedule": schedule })))
}

pub async fn get_upcoming(
    State(service): State<Arc<MedicationService>>,
    Extension(session): Extension<UserSession>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Value>, AppError> {
    let now = now_minutes(&service, query.now.as_deref())?;
    debug!("Upcoming doses for {} from minute {}", session.user_id(), now);

    let upcoming = service.upcoming(&session, now).await;
    Ok(Json(json!({ "upcoming": upcoming })))
}

pub async fn get_summary(
    State(service): State<Arc<MedicationService>>,
    Extension(session): Extension<UserSession>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Value>, AppError> {
    let now = now_minutes(&service, query.now.as_deref())?;
    let today = Local::now().date_naive();

    let summary = service.summary(&session, today, now).await;
    Ok(Json(json!(summary)))
}

fn now_minutes(service: &MedicationService, raw: Option<&str>) -> Result<u32, AppError> {
    match raw {
        Some(raw) => service
            .schedule_builder()
            .parser()
            .minutes(raw)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid time of day: {}", raw))),
        None => {
            let now = Local::now();
            Ok(now.hour() * 60 + now.minute())
        }
    }
}
