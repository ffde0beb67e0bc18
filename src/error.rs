use std::fmt;

use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::db::StoreError;
use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Entity {
    Student,
    Class,
    Teacher,
    Enrollment,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Student => "Student",
            Entity::Class => "Class",
            Entity::Teacher => "Teacher",
            Entity::Enrollment => "Enrollment",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("{0} not found")]
    NotFound(Entity),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(Vec<ValidationError>),

    /// Class schedule collides with existing rooms or teacher bookings.
    #[error("Schedule conflict: {}", .0.join("; "))]
    ScheduleConflict(Vec<String>),

    /// Enrollment overlaps the student's existing enrollments.
    #[error("Conflict: {message}")]
    EnrollmentConflict {
        message: String,
        conflicts: Vec<String>,
    },

    #[error("Conflict: {0}")]
    Conflict(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ValidationError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut details = Vec::new();
        let mut conflicts = Vec::new();

        let (status, error_message) = match self {
            AppError::NotFound(entity) => (StatusCode::NOT_FOUND, format!("{entity} not found")),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Validation(errors) => {
                let message = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                details = errors;
                (StatusCode::BAD_REQUEST, message)
            }
            AppError::ScheduleConflict(found) => {
                let message = format!("Schedule conflicts detected: {} collision(s)", found.len());
                conflicts = found;
                (StatusCode::BAD_REQUEST, message)
            }
            AppError::EnrollmentConflict { message, conflicts: found } => {
                conflicts = found;
                (StatusCode::CONFLICT, message)
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Store(e) => {
                error!("storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
            details,
            conflicts,
        });

        (status, body).into_response()
    }
}
