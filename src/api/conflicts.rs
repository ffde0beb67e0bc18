use std::collections::BTreeSet;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ValidatedJson;
use crate::error::AppError;
use crate::models::{ROOM_CODE_RE, STRICT_TIME_RE};
use crate::services::{RoomConflict, SkippedClass, TeacherConflict};
use crate::state::AppState;
use crate::validation::{SlotRule, day_name, slot_order, validate_interval, validate_slot};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "room_slot_order"))]
pub(super) struct RoomCheckRequest {
    #[validate(regex(path = *ROOM_CODE_RE, code = "invalid_room", message = "must be one uppercase letter followed by three digits"))]
    room: String,
    #[validate(custom(function = "day_name"))]
    day: String,
    #[validate(regex(path = *STRICT_TIME_RE, code = "invalid_time", message = "must be a 24-hour time formatted HH:MM"))]
    start_time: String,
    #[validate(regex(path = *STRICT_TIME_RE, code = "invalid_time", message = "must be a 24-hour time formatted HH:MM"))]
    end_time: String,
    exclude_class_id: Option<String>,
}

fn room_slot_order(req: &RoomCheckRequest) -> Result<(), validator::ValidationError> {
    slot_order(&req.start_time, &req.end_time, SlotRule::ClassSession)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "teacher_slot_order"))]
pub(super) struct TeacherCheckRequest {
    #[validate(length(min = 1, code = "required", message = "teacherId is required"))]
    teacher_id: String,
    #[validate(custom(function = "day_name"))]
    day: String,
    #[validate(regex(path = *STRICT_TIME_RE, code = "invalid_time", message = "must be a 24-hour time formatted HH:MM"))]
    start_time: String,
    #[validate(regex(path = *STRICT_TIME_RE, code = "invalid_time", message = "must be a 24-hour time formatted HH:MM"))]
    end_time: String,
    exclude_class_id: Option<String>,
}

fn teacher_slot_order(req: &TeacherCheckRequest) -> Result<(), validator::ValidationError> {
    slot_order(&req.start_time, &req.end_time, SlotRule::ClassSession)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ConflictCheckResponse<T> {
    has_conflict: bool,
    conflicts: Vec<T>,
    message: String,
    skipped_classes: Vec<SkippedClass>,
}

fn distinct_classes<'a>(ids: impl Iterator<Item = &'a String>) -> usize {
    ids.collect::<BTreeSet<_>>().len()
}

pub(super) async fn check_room(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RoomCheckRequest>,
) -> Result<Json<ConflictCheckResponse<RoomConflict>>, AppError> {
    let candidate = validate_interval(
        &req.day,
        &req.start_time,
        &req.end_time,
        &req.room,
        SlotRule::ClassSession,
    )
    .map_err(AppError::Validation)?;

    let report = state
        .conflicts()
        .check_room(&candidate, req.exclude_class_id.as_deref())
        .await?;

    let conflicts = report.room_conflicts;
    let message = if conflicts.is_empty() {
        "Room is available".to_string()
    } else {
        format!(
            "Room conflict detected with {} class(es)",
            distinct_classes(conflicts.iter().map(|c| &c.class_id))
        )
    };

    Ok(Json(ConflictCheckResponse {
        has_conflict: !conflicts.is_empty(),
        conflicts,
        message,
        skipped_classes: report.skipped_classes,
    }))
}

pub(super) async fn check_teacher(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<TeacherCheckRequest>,
) -> Result<Json<ConflictCheckResponse<TeacherConflict>>, AppError> {
    let candidate = validate_slot(&req.day, &req.start_time, &req.end_time, SlotRule::ClassSession)
        .map_err(AppError::Validation)?;

    if state.store.find_teacher_by_id(&req.teacher_id).await?.is_none() {
        return Err(AppError::BadRequest("Teacher not found".to_string()));
    }

    let report = state
        .conflicts()
        .check_teacher(&candidate, &req.teacher_id, req.exclude_class_id.as_deref())
        .await?;

    let conflicts = report.teacher_conflicts;
    let message = if conflicts.is_empty() {
        "Teacher is available".to_string()
    } else {
        format!(
            "Teacher has time conflict with {} class(es)",
            distinct_classes(conflicts.iter().map(|c| &c.class_id))
        )
    };

    Ok(Json(ConflictCheckResponse {
        has_conflict: !conflicts.is_empty(),
        conflicts,
        message,
        skipped_classes: report.skipped_classes,
    }))
}
