mod classes;
mod conflicts;
mod enrollments;
mod extract;
mod people;

use axum::routing::{delete, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};

use self::extract::ValidatedJson;
use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/classes", get(classes::list_classes).post(classes::create_class))
        .route(
            "/classes/{id}",
            get(classes::get_class)
                .put(classes::update_class)
                .delete(classes::delete_class),
        )
        .route("/classes/teacher/{teacher_id}", get(classes::list_classes_by_teacher))
        .route("/teachers", post(people::create_teacher))
        .route("/teachers/{id}", get(people::get_teacher))
        .route("/students", post(people::create_student))
        .route("/students/{id}", get(people::get_student))
        .route("/enrollments", post(enrollments::create_enrollment))
        .route(
            "/enrollments/{id}",
            get(enrollments::get_enrollment).delete(enrollments::delete_enrollment),
        )
        .route(
            "/enrollments/student/{student_id}",
            get(enrollments::list_by_student),
        )
        .route("/enrollments/class/{class_id}", get(enrollments::list_by_class))
        .route(
            "/enrollments/student/{student_id}/class/{class_id}",
            delete(enrollments::delete_by_student_and_class),
        )
        .route("/conflicts/check-room", post(conflicts::check_room))
        .route("/conflicts/check-teacher", post(conflicts::check_teacher))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.store.ping().await?;
    Ok(StatusCode::OK)
}
