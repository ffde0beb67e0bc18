use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use super::interval::{ClockTime, DayOfWeek, RoomCode, TimeInterval};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleFormatError {
    #[error("schedule is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("schedule must be an object keyed by day name")]
    NotAnObject,

    #[error("schedule entry for {0} must be a list")]
    DayNotAList(DayOfWeek),

    #[error("session {index} on {day} is invalid: {reason}")]
    InvalidSession {
        day: DayOfWeek,
        index: usize,
        reason: String,
    },
}

/// A single entry of a day's list in the persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub room: RoomCode,
    pub start: ClockTime,
    pub end: ClockTime,
}

impl Session {
    pub fn at(&self, day: DayOfWeek) -> TimeInterval {
        TimeInterval::new(day, self.start, self.end, self.room.clone())
    }
}

/// Weekly schedule of a class: day name to the sessions held that day.
///
/// Persisted as `{"monday": [{"room": "A203", "start": "08:00", "end": "10:00"}], ...}`.
/// Days without sessions are omitted on write and tolerated when absent or
/// empty on read. Keys that are not day names are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    days: BTreeMap<DayOfWeek, Vec<Session>>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self, ScheduleFormatError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ScheduleFormatError::InvalidJson(e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, ScheduleFormatError> {
        let object = value.as_object().ok_or(ScheduleFormatError::NotAnObject)?;
        let mut schedule = Schedule::new();

        for (key, entries) in object {
            let Ok(day) = key.parse::<DayOfWeek>() else {
                continue;
            };
            let entries = entries
                .as_array()
                .ok_or(ScheduleFormatError::DayNotAList(day))?;

            for (index, entry) in entries.iter().enumerate() {
                let session: Session = serde_json::from_value(entry.clone()).map_err(|e| {
                    ScheduleFormatError::InvalidSession {
                        day,
                        index,
                        reason: e.to_string(),
                    }
                })?;
                schedule.insert(day, session);
            }
        }

        Ok(schedule)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (day, sessions) in self.days.iter().filter(|(_, s)| !s.is_empty()) {
            let entries = sessions
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "room": s.room.as_str(),
                        "start": s.start.to_string(),
                        "end": s.end.to_string(),
                    })
                })
                .collect();
            map.insert(day.as_str().to_string(), Value::Array(entries));
        }
        Value::Object(map)
    }

    pub fn serialize(&self) -> String {
        self.to_value().to_string()
    }

    pub fn insert(&mut self, day: DayOfWeek, session: Session) {
        self.days.entry(day).or_default().push(session);
    }

    pub fn sessions(&self, day: DayOfWeek) -> &[Session] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn for_day(&self, day: DayOfWeek) -> Vec<TimeInterval> {
        self.sessions(day).iter().map(|s| s.at(day)).collect()
    }

    /// Every session of the week, Monday first.
    pub fn intervals(&self) -> impl Iterator<Item = TimeInterval> + '_ {
        self.days
            .iter()
            .flat_map(|(day, sessions)| sessions.iter().map(move |s| s.at(*day)))
    }

    /// Uppercased room codes used anywhere in the week.
    pub fn rooms(&self) -> BTreeSet<String> {
        self.days
            .values()
            .flatten()
            .map(|s| s.room.normalized())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for Schedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "monday": [
            {"room": "A203", "start": "08:00", "end": "10:00"},
            {"room": "B101", "start": "13:00", "end": "14:30"}
        ],
        "wednesday": [],
        "notes": "ignored"
    }"#;

    #[test]
    fn parses_days_and_ignores_unknown_keys() {
        let schedule = Schedule::parse(SAMPLE).unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.for_day(DayOfWeek::Monday).len(), 2);
        assert!(schedule.for_day(DayOfWeek::Wednesday).is_empty());
        assert!(schedule.for_day(DayOfWeek::Sunday).is_empty());
    }

    #[test]
    fn serialized_form_recovers_same_sessions() {
        let schedule = Schedule::parse(SAMPLE).unwrap();
        let text = schedule.serialize();
        let reparsed = Schedule::parse(&text).unwrap();
        assert_eq!(schedule, reparsed);
        assert!(!text.contains("wednesday"));
    }

    #[test]
    fn rejects_non_list_day() {
        let err = Schedule::parse(r#"{"monday": {"room": "A203"}}"#).unwrap_err();
        assert_eq!(err, ScheduleFormatError::DayNotAList(DayOfWeek::Monday));
    }

    #[test]
    fn rejects_invalid_json_and_non_objects() {
        assert!(matches!(
            Schedule::parse("not json"),
            Err(ScheduleFormatError::InvalidJson(_))
        ));
        assert_eq!(
            Schedule::parse("[]").unwrap_err(),
            ScheduleFormatError::NotAnObject
        );
    }

    #[test]
    fn rejects_session_with_bad_time() {
        let err = Schedule::parse(r#"{"friday": [{"room": "A203", "start": "8am", "end": "10:00"}]}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleFormatError::InvalidSession { day: DayOfWeek::Friday, index: 0, .. }
        ));
    }

    #[test]
    fn capitalized_day_keys_are_accepted() {
        let schedule =
            Schedule::parse(r#"{"Tuesday": [{"room": "C001", "start": "9:00", "end": "10:00"}]}"#)
                .unwrap();
        let sessions = schedule.for_day(DayOfWeek::Tuesday);
        assert_eq!(sessions[0].slot.start.to_string(), "09:00");
    }

    #[test]
    fn rooms_are_normalized() {
        let schedule = Schedule::parse(
            r#"{"monday": [{"room": "a203", "start": "08:00", "end": "09:00"}],
                "friday": [{"room": "A203", "start": "08:00", "end": "09:00"}]}"#,
        )
        .unwrap();
        assert_eq!(schedule.rooms().into_iter().collect::<Vec<_>>(), vec!["A203"]);
    }
}
