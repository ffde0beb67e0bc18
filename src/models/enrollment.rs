use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::interval::{
    ClockTime, DayOfWeek, MalformedTimeError, ROOM_CODE_RE, RoomCode, STRICT_TIME_RE, TimeInterval,
    UnknownDayError,
};
use crate::validation::{self, SlotRule, day_name, slot_order, validate_interval};

/// A student's booking of one specific time slot of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub student_id: String,
    pub class_id: String,
    #[serde(flatten)]
    pub interval: TimeInterval,
    pub created_at: String,
}

impl Enrollment {
    pub fn new(student_id: &str, class_id: &str, interval: TimeInterval) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            class_id: class_id.to_string(),
            interval,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// Same student, same class, same day and times.
    pub fn is_exact_duplicate_of(&self, student_id: &str, class_id: &str, interval: &TimeInterval) -> bool {
        self.student_id == student_id
            && self.class_id == class_id
            && self.interval.slot.same_times(&interval.slot)
    }
}

#[derive(Debug, Error)]
pub enum InvalidEnrollmentRow {
    #[error(transparent)]
    Day(#[from] UnknownDayError),

    #[error(transparent)]
    Time(#[from] MalformedTimeError),
}

#[derive(Debug, Clone, FromRow)]
pub struct EnrollmentRow {
    pub id: String,
    pub student_id: String,
    pub class_id: String,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    pub room: String,
    pub created_at: String,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = InvalidEnrollmentRow;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        let day: DayOfWeek = row.day.parse()?;
        let start: ClockTime = row.start_time.parse()?;
        let end: ClockTime = row.end_time.parse()?;

        Ok(Enrollment {
            id: row.id,
            student_id: row.student_id,
            class_id: row.class_id,
            interval: TimeInterval::new(day, start, end, RoomCode::new(row.room)),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "enrollment_slot_order"))]
pub struct NewEnrollmentRequest {
    #[validate(length(min = 1, code = "required", message = "studentId is required"))]
    pub student_id: String,
    #[validate(length(min = 1, code = "required", message = "classId is required"))]
    pub class_id: String,
    #[validate(custom(function = "day_name"))]
    pub day: String,
    #[validate(regex(path = *STRICT_TIME_RE, code = "invalid_time", message = "must be a 24-hour time formatted HH:MM"))]
    pub start_time: String,
    #[validate(regex(path = *STRICT_TIME_RE, code = "invalid_time", message = "must be a 24-hour time formatted HH:MM"))]
    pub end_time: String,
    #[validate(regex(path = *ROOM_CODE_RE, code = "invalid_room", message = "must be one uppercase letter followed by three digits"))]
    pub room: String,
}

fn enrollment_slot_order(req: &NewEnrollmentRequest) -> Result<(), validator::ValidationError> {
    slot_order(&req.start_time, &req.end_time, SlotRule::Enrollment)
}

impl NewEnrollmentRequest {
    /// The requested slot as a typed interval.
    pub fn interval(&self) -> Result<TimeInterval, Vec<validation::ValidationError>> {
        validate_interval(
            &self.day,
            &self.start_time,
            &self.end_time,
            &self.room,
            SlotRule::Enrollment,
        )
    }
}
