//! Structural checks on incoming slots and schedule documents.
//!
//! Request bodies are checked field by field through `validator` derives; the
//! rule functions those derives call live here next to the typed conversions
//! and the schedule-document walk. Every check runs independently and all
//! failures are collected, so a caller can reject a request once with the
//! complete list.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use validator::ValidationErrors;

use crate::models::{ClockTime, DayOfWeek, RoomCode, Schedule, TimeInterval, TimeSlot};

/// Shortest bookable enrollment slot.
pub const MIN_ENROLLMENT_MINUTES: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    Required,
    InvalidDay,
    InvalidTime,
    InvalidRoom,
    StartNotBeforeEnd,
    DurationTooShort,
    InvalidSchedule,
    InvalidEmail,
    InvalidBody,
}

impl ValidationCode {
    const ALL: [ValidationCode; 9] = [
        ValidationCode::Required,
        ValidationCode::InvalidDay,
        ValidationCode::InvalidTime,
        ValidationCode::InvalidRoom,
        ValidationCode::StartNotBeforeEnd,
        ValidationCode::DurationTooShort,
        ValidationCode::InvalidSchedule,
        ValidationCode::InvalidEmail,
        ValidationCode::InvalidBody,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::Required => "required",
            ValidationCode::InvalidDay => "invalid_day",
            ValidationCode::InvalidTime => "invalid_time",
            ValidationCode::InvalidRoom => "invalid_room",
            ValidationCode::StartNotBeforeEnd => "start_not_before_end",
            ValidationCode::DurationTooShort => "duration_too_short",
            ValidationCode::InvalidSchedule => "invalid_schedule",
            ValidationCode::InvalidEmail => "invalid_email",
            ValidationCode::InvalidBody => "invalid_body",
        }
    }

    /// Codes this crate does not name (a bare `length` or `email` rule) fall
    /// back to [`ValidationCode::InvalidBody`].
    pub fn from_code(code: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|known| known.as_str() == code)
            .unwrap_or(ValidationCode::InvalidBody)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub code: ValidationCode,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRule {
    /// A session in a class schedule: only `start < end`.
    ClassSession,
    /// An enrollment slot: `start < end` and at least [`MIN_ENROLLMENT_MINUTES`].
    Enrollment,
}

/// Field names as they appear in the payload being validated.
struct FieldNames<'a> {
    prefix: &'a str,
    start: &'static str,
    end: &'static str,
}

const REQUEST_FIELDS: FieldNames<'static> = FieldNames {
    prefix: "",
    start: "startTime",
    end: "endTime",
};

impl FieldNames<'_> {
    fn path(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.prefix, name)
        }
    }
}

fn parse_day(names: &FieldNames<'_>, raw: &str, errors: &mut Vec<ValidationError>) -> Option<DayOfWeek> {
    match raw.parse::<DayOfWeek>() {
        Ok(day) => Some(day),
        Err(_) => {
            errors.push(ValidationError::new(
                names.path("day"),
                ValidationCode::InvalidDay,
                format!("'{raw}' is not a day of the week (monday..sunday)"),
            ));
            None
        }
    }
}

fn parse_time(field: String, raw: &str, errors: &mut Vec<ValidationError>) -> Option<ClockTime> {
    match ClockTime::parse_strict(raw) {
        Ok(time) => Some(time),
        Err(_) => {
            errors.push(ValidationError::new(
                field,
                ValidationCode::InvalidTime,
                format!("'{raw}' must be a 24-hour time formatted HH:MM"),
            ));
            None
        }
    }
}

fn parse_room(field: String, raw: &str, errors: &mut Vec<ValidationError>) -> Option<RoomCode> {
    if RoomCode::is_well_formed(raw) {
        Some(RoomCode::new(raw))
    } else {
        errors.push(ValidationError::new(
            field,
            ValidationCode::InvalidRoom,
            format!("'{raw}' must be one uppercase letter followed by three digits"),
        ));
        None
    }
}

fn collect_slot(
    names: &FieldNames<'_>,
    day: Option<DayOfWeek>,
    start: &str,
    end: &str,
    rule: SlotRule,
    errors: &mut Vec<ValidationError>,
) -> Option<TimeSlot> {
    let start = parse_time(names.path(names.start), start, errors);
    let end = parse_time(names.path(names.end), end, errors);
    let (start, end) = (start?, end?);

    let mut ok = true;
    if start >= end {
        errors.push(ValidationError::new(
            names.path(names.start),
            ValidationCode::StartNotBeforeEnd,
            format!("start time ({start}) must be before end time ({end})"),
        ));
        ok = false;
    }
    if rule == SlotRule::Enrollment && start.minutes_until(end) < MIN_ENROLLMENT_MINUTES {
        errors.push(ValidationError::new(
            names.path(names.end),
            ValidationCode::DurationTooShort,
            format!("duration must be at least {MIN_ENROLLMENT_MINUTES} minutes"),
        ));
        ok = false;
    }

    if ok { Some(TimeSlot::new(day?, start, end)) } else { None }
}

/// Validates a day/start/end triple without a room (teacher availability checks).
pub fn validate_slot(day: &str, start: &str, end: &str, rule: SlotRule) -> Result<TimeSlot, Vec<ValidationError>> {
    let names = REQUEST_FIELDS;
    let mut errors = Vec::new();
    let day = parse_day(&names, day, &mut errors);
    let slot = collect_slot(&names, day, start, end, rule, &mut errors);

    match slot {
        Some(slot) if errors.is_empty() => Ok(slot),
        _ => Err(errors),
    }
}

/// Validates a full day/start/end/room interval from a request body.
pub fn validate_interval(
    day: &str,
    start: &str,
    end: &str,
    room: &str,
    rule: SlotRule,
) -> Result<TimeInterval, Vec<ValidationError>> {
    let names = REQUEST_FIELDS;
    let mut errors = Vec::new();
    let day = parse_day(&names, day, &mut errors);
    let slot = collect_slot(&names, day, start, end, rule, &mut errors);
    let room = parse_room(names.path("room"), room, &mut errors);

    match (slot, room) {
        (Some(slot), Some(room)) if errors.is_empty() => Ok(TimeInterval { slot, room }),
        _ => Err(errors),
    }
}

/// Validates a submitted schedule document and parses it.
///
/// The document may arrive as an object or as a string holding its JSON
/// text; a string is decoded once here. Unlike [`Schedule::parse`], which
/// skips non-day keys in stored rows, a submitted key that is not a day name
/// is reported.
pub fn validate_schedule(doc: &Value) -> Result<Schedule, Vec<ValidationError>> {
    match doc {
        Value::String(text) => {
            let decoded: Value = serde_json::from_str(text).map_err(|e| {
                vec![ValidationError::new(
                    "schedule",
                    ValidationCode::InvalidSchedule,
                    format!("schedule text is not valid JSON: {e}"),
                )]
            })?;
            validate_schedule_document(&decoded)
        }
        _ => validate_schedule_document(doc),
    }
}

fn validate_schedule_document(doc: &Value) -> Result<Schedule, Vec<ValidationError>> {
    let Some(object) = doc.as_object() else {
        return Err(vec![ValidationError::new(
            "schedule",
            ValidationCode::InvalidSchedule,
            "schedule must be an object keyed by day name",
        )]);
    };

    let mut errors = Vec::new();
    for (key, entries) in object {
        let day_path = format!("schedule.{key}");
        let day = match key.parse::<DayOfWeek>() {
            Ok(day) => day,
            Err(_) => {
                errors.push(ValidationError::new(
                    day_path,
                    ValidationCode::InvalidDay,
                    format!("'{key}' is not a day of the week (monday..sunday)"),
                ));
                continue;
            }
        };
        let Some(entries) = entries.as_array() else {
            errors.push(ValidationError::new(
                day_path,
                ValidationCode::InvalidSchedule,
                "sessions for a day must be a list",
            ));
            continue;
        };

        for (index, entry) in entries.iter().enumerate() {
            let prefix = format!("{day_path}[{index}]");
            let names = FieldNames {
                prefix: &prefix,
                start: "start",
                end: "end",
            };
            let text = |name: &str| entry.get(name).and_then(Value::as_str);

            match (text("room"), text("start"), text("end")) {
                (Some(room), Some(start), Some(end)) => {
                    collect_slot(&names, Some(day), start, end, SlotRule::ClassSession, &mut errors);
                    parse_room(names.path("room"), room, &mut errors);
                }
                _ => errors.push(ValidationError::new(
                    prefix.clone(),
                    ValidationCode::Required,
                    "session needs string fields room, start and end",
                )),
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Schedule::from_value(doc)
        .map_err(|e| vec![ValidationError::new("schedule", ValidationCode::InvalidSchedule, e.to_string())])
}

fn rule_error(code: ValidationCode, field: &'static str, message: String) -> validator::ValidationError {
    let mut error = validator::ValidationError::new(code.as_str());
    error.message = Some(Cow::Owned(message));
    error.add_param(Cow::Borrowed("field"), &field);
    error
}

/// Rejects blank required text.
pub fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut error = validator::ValidationError::new(ValidationCode::Required.as_str());
        error.message = Some(Cow::Borrowed("must not be blank"));
        return Err(error);
    }
    Ok(())
}

pub fn day_name(value: &str) -> Result<(), validator::ValidationError> {
    if value.parse::<DayOfWeek>().is_err() {
        let mut error = validator::ValidationError::new(ValidationCode::InvalidDay.as_str());
        error.message = Some(Cow::Owned(format!(
            "'{value}' is not a day of the week (monday..sunday)"
        )));
        return Err(error);
    }
    Ok(())
}

/// Cross-field rule for `startTime`/`endTime`. Malformed times are left to
/// the per-field format rules.
pub fn slot_order(start: &str, end: &str, rule: SlotRule) -> Result<(), validator::ValidationError> {
    let (Ok(start), Ok(end)) = (ClockTime::parse_strict(start), ClockTime::parse_strict(end)) else {
        return Ok(());
    };
    if start >= end {
        return Err(rule_error(
            ValidationCode::StartNotBeforeEnd,
            "startTime",
            format!("start time ({start}) must be before end time ({end})"),
        ));
    }
    if rule == SlotRule::Enrollment && start.minutes_until(end) < MIN_ENROLLMENT_MINUTES {
        return Err(rule_error(
            ValidationCode::DurationTooShort,
            "endTime",
            format!("duration must be at least {MIN_ENROLLMENT_MINUTES} minutes"),
        ));
    }
    Ok(())
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Flattens `validator` output into payload-named field errors, sorted by field.
/// Struct-level rules name their field through a `field` param.
pub fn from_validation_errors(errors: &ValidationErrors) -> Vec<ValidationError> {
    let mut found: Vec<ValidationError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, failures)| {
            let field = camel_case(&field);
            failures.iter().map(move |failure| {
                let field = failure
                    .params
                    .get("field")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| field.clone());
                let message = failure
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"));
                ValidationError::new(field, ValidationCode::from_code(&failure.code), message)
            })
        })
        .collect();
    found.sort_by(|a, b| a.field.cmp(&b.field));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codes(errors: &[ValidationError]) -> Vec<ValidationCode> {
        errors.iter().map(|e| e.code).collect()
    }

    #[test]
    fn accepts_well_formed_enrollment_slot() {
        let interval = validate_interval("Monday", "08:00", "10:00", "A203", SlotRule::Enrollment).unwrap();
        assert_eq!(interval.day(), DayOfWeek::Monday);
        assert_eq!(interval.room.as_str(), "A203");
    }

    #[test]
    fn rejects_each_malformed_field() {
        assert_eq!(
            codes(&validate_interval("monday", "08:00", "10:00", "a203", SlotRule::Enrollment).unwrap_err()),
            vec![ValidationCode::InvalidRoom]
        );
        assert_eq!(
            codes(&validate_interval("monday", "08:00", "10:00", "A20", SlotRule::Enrollment).unwrap_err()),
            vec![ValidationCode::InvalidRoom]
        );
        assert_eq!(
            codes(&validate_interval("monday", "25:00", "10:00", "A203", SlotRule::Enrollment).unwrap_err()),
            vec![ValidationCode::InvalidTime]
        );
        assert_eq!(
            codes(&validate_interval("Mon", "08:00", "10:00", "A203", SlotRule::Enrollment).unwrap_err()),
            vec![ValidationCode::InvalidDay]
        );
    }

    #[test]
    fn reports_all_failures_at_once() {
        let errors = validate_interval("Mon", "8:00", "10:00", "a1", SlotRule::Enrollment).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["day", "startTime", "room"]);
    }

    #[test]
    fn start_must_precede_end() {
        let errors = validate_slot("monday", "10:00", "10:00", SlotRule::ClassSession).unwrap_err();
        assert_eq!(codes(&errors), vec![ValidationCode::StartNotBeforeEnd]);

        let errors = validate_slot("monday", "23:00", "01:00", SlotRule::Enrollment).unwrap_err();
        assert_eq!(
            codes(&errors),
            vec![ValidationCode::StartNotBeforeEnd, ValidationCode::DurationTooShort]
        );
    }

    #[test]
    fn minimum_duration_applies_to_enrollments_only() {
        assert!(validate_slot("monday", "08:00", "08:29", SlotRule::ClassSession).is_ok());
        let errors = validate_slot("monday", "08:00", "08:29", SlotRule::Enrollment).unwrap_err();
        assert_eq!(errors[0].field, "endTime");
        assert!(validate_slot("monday", "08:00", "08:30", SlotRule::Enrollment).is_ok());
    }

    #[test]
    fn schedule_document_errors_are_field_attributed() {
        let doc = json!({
            "monday": [{"room": "A203", "start": "08:00", "end": "10:00"}],
            "tuesday": [{"room": "x1", "start": "11:00", "end": "10:00"}],
            "mon": []
        });
        let errors = validate_schedule(&doc).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"schedule.mon"));
        assert!(fields.contains(&"schedule.tuesday[0].start"));
        assert!(fields.contains(&"schedule.tuesday[0].room"));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn valid_schedule_document_parses() {
        let doc = json!({"wednesday": [{"room": "B110", "start": "14:00", "end": "15:30"}]});
        let schedule = validate_schedule(&doc).unwrap();
        assert_eq!(schedule.for_day(DayOfWeek::Wednesday).len(), 1);
    }

    #[test]
    fn schedule_may_arrive_as_json_text() {
        let text = json!({"monday": [{"room": "A203", "start": "08:00", "end": "10:00"}]}).to_string();
        let schedule = validate_schedule(&Value::String(text)).unwrap();
        assert_eq!(schedule.for_day(DayOfWeek::Monday).len(), 1);

        let errors = validate_schedule(&Value::String("{monday".to_string())).unwrap_err();
        assert_eq!(codes(&errors), vec![ValidationCode::InvalidSchedule]);

        let nested = Value::String(Value::String("{}".to_string()).to_string());
        assert_eq!(
            codes(&validate_schedule(&nested).unwrap_err()),
            vec![ValidationCode::InvalidSchedule]
        );
    }

    #[test]
    fn slot_order_names_the_offending_field() {
        let error = slot_order("10:00", "09:00", SlotRule::ClassSession).unwrap_err();
        assert_eq!(error.code, "start_not_before_end");
        assert_eq!(error.params.get("field"), Some(&json!("startTime")));

        let error = slot_order("08:00", "08:20", SlotRule::Enrollment).unwrap_err();
        assert_eq!(error.code, "duration_too_short");
        assert!(slot_order("08:00", "08:20", SlotRule::ClassSession).is_ok());
        assert!(slot_order("8:00", "08:20", SlotRule::Enrollment).is_ok());
    }

    #[test]
    fn codes_round_trip_through_their_names() {
        for code in ValidationCode::ALL {
            assert_eq!(ValidationCode::from_code(code.as_str()), code);
        }
        assert_eq!(ValidationCode::from_code("length"), ValidationCode::InvalidBody);
        assert_eq!(camel_case("start_time"), "startTime");
    }

    #[test]
    fn missing_session_fields_are_required() {
        let doc = json!({"friday": [{"room": "B110"}]});
        let errors = validate_schedule(&doc).unwrap_err();
        assert_eq!(codes(&errors), vec![ValidationCode::Required]);
    }
}
