use axum::Json;
use axum::extract::{Path, State};

use super::ValidatedJson;
use crate::db::StoreError;
use crate::error::{AppError, Entity};
use crate::models::{NewStudentRequest, NewTeacherRequest, Student, Teacher};
use crate::state::AppState;

pub(super) async fn create_teacher(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<NewTeacherRequest>,
) -> Result<Json<Teacher>, AppError> {
    let teacher = Teacher::new(req.name.trim().to_string(), req.subject);
    let saved = state.store.save_teacher(&teacher).await?;
    Ok(Json(saved))
}

pub(super) async fn get_teacher(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Teacher>, AppError> {
    let teacher = state
        .store
        .find_teacher_by_id(&id)
        .await?
        .ok_or(AppError::NotFound(Entity::Teacher))?;
    Ok(Json(teacher))
}

pub(super) async fn create_student(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<NewStudentRequest>,
) -> Result<Json<Student>, AppError> {
    let student = Student::new(req.name.trim().to_string(), req.email.trim().to_string());
    match state.store.save_student(&student).await {
        Ok(saved) => Ok(Json(saved)),
        Err(StoreError::UniqueViolation(_)) => {
            Err(AppError::Conflict(format!("Email {} is already registered", student.email)))
        }
        Err(e) => Err(e.into()),
    }
}

pub(super) async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Student>, AppError> {
    let student = state
        .store
        .find_student_by_id(&id)
        .await?
        .ok_or(AppError::NotFound(Entity::Student))?;
    Ok(Json(student))
}
