use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::ValidatedJson;
use crate::error::{AppError, Entity};
use crate::models::{Enrollment, NewEnrollmentRequest};
use crate::state::AppState;

pub(super) async fn create_enrollment(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<NewEnrollmentRequest>,
) -> Result<Json<Enrollment>, AppError> {
    let interval = req.interval().map_err(AppError::Validation)?;

    let enrollment = state
        .enrollments()
        .try_enroll(&req.student_id, &req.class_id, interval)
        .await?;
    Ok(Json(enrollment))
}

pub(super) async fn get_enrollment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = state
        .store
        .find_enrollment_by_id(&id)
        .await?
        .ok_or(AppError::NotFound(Entity::Enrollment))?;
    Ok(Json(enrollment))
}

pub(super) async fn list_by_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    state
        .store
        .find_student_by_id(&student_id)
        .await?
        .ok_or(AppError::NotFound(Entity::Student))?;
    let enrollments = state.store.find_enrollments_by_student(&student_id).await?;
    Ok(Json(enrollments))
}

pub(super) async fn list_by_class(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    state
        .store
        .find_class_by_id(&class_id)
        .await?
        .ok_or(AppError::NotFound(Entity::Class))?;
    let enrollments = state.store.find_enrollments_by_class(&class_id).await?;
    Ok(Json(enrollments))
}

pub(super) async fn delete_enrollment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.enrollments().delete(&id).await?;
    Ok(StatusCode::OK)
}

pub(super) async fn delete_by_student_and_class(
    State(state): State<AppState>,
    Path((student_id, class_id)): Path<(String, String)>,
) -> Result<Json<Enrollment>, AppError> {
    let removed = state
        .enrollments()
        .delete_by_student_and_class(&student_id, &class_id)
        .await?;
    Ok(Json(removed))
}
