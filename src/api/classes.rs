use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::ValidatedJson;
use crate::error::AppError;
use crate::models::{Class, ClassRequest};
use crate::state::AppState;

pub(super) async fn list_classes(State(state): State<AppState>) -> Result<Json<Vec<Class>>, AppError> {
    let classes = state.classes().list().await?;
    Ok(Json(classes))
}

pub(super) async fn list_classes_by_teacher(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
) -> Result<Json<Vec<Class>>, AppError> {
    let classes = state.classes().list_by_teacher(&teacher_id).await?;
    Ok(Json(classes))
}

pub(super) async fn get_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Class>, AppError> {
    let class = state.classes().get(&id).await?;
    Ok(Json(class))
}

pub(super) async fn create_class(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ClassRequest>,
) -> Result<Json<Class>, AppError> {
    let class = state.classes().create(req).await?;
    Ok(Json(class))
}

pub(super) async fn update_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ClassRequest>,
) -> Result<Json<Class>, AppError> {
    let class = state.classes().update(&id, req).await?;
    Ok(Json(class))
}

pub(super) async fn delete_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.classes().delete(&id).await?;
    Ok(StatusCode::OK)
}
