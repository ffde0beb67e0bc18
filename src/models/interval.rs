use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub static STRICT_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").unwrap());

pub static ROOM_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z][0-9]{3}$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed time '{0}', expected HH:MM")]
pub struct MalformedTimeError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown day '{0}'")]
pub struct UnknownDayError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl FromStr for DayOfWeek {
    type Err = UnknownDayError;

    /// Full weekday names only, any case. Abbreviations such as `Mon` are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        DayOfWeek::ALL
            .into_iter()
            .find(|day| day.as_str() == lowered)
            .ok_or_else(|| UnknownDayError(s.to_string()))
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DayOfWeek {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DayOfWeek {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Wall-clock time of day at minute precision, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    /// Accepts only zero-padded `HH:MM`.
    pub fn parse_strict(s: &str) -> Result<Self, MalformedTimeError> {
        if !STRICT_TIME_RE.is_match(s) {
            return Err(MalformedTimeError(s.to_string()));
        }
        s.parse()
    }

    /// Signed number of minutes from `self` to `later`.
    pub fn minutes_until(&self, later: ClockTime) -> i32 {
        i32::from(later.0) - i32::from(self.0)
    }
}

impl FromStr for ClockTime {
    type Err = MalformedTimeError;

    /// Lenient form: `H:MM` or `HH:MM`, 24-hour.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MalformedTimeError(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(err)?;

        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if h.is_empty() || h.len() > 2 || m.len() != 2 || !digits(h) || !digits(m) {
            return Err(err());
        }

        let hours: u16 = h.parse().map_err(|_| err())?;
        let minutes: u16 = m.parse().map_err(|_| err())?;
        if hours > 23 || minutes > 59 {
            return Err(err());
        }

        Ok(ClockTime(hours * 60 + minutes))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Room identifier as stored. Well-formed codes are one uppercase letter and
/// three digits (`A203`); stored legacy values are carried as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(code: &str) -> bool {
        ROOM_CODE_RE.is_match(code)
    }

    /// Case-insensitive comparison.
    pub fn matches(&self, other: &RoomCode) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// Uppercased form, used as a lock key.
    pub fn normalized(&self) -> String {
        self.0.to_ascii_uppercase()
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One weekly recurring occurrence without a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub day: DayOfWeek,
    #[serde(rename = "startTime")]
    pub start: ClockTime,
    #[serde(rename = "endTime")]
    pub end: ClockTime,
}

impl TimeSlot {
    pub fn new(day: DayOfWeek, start: ClockTime, end: ClockTime) -> Self {
        Self { day, start, end }
    }

    /// Strict overlap on the same day. Touching endpoints do not overlap,
    /// identical slots do.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.day == other.day && self.start < other.end && other.start < self.end
    }

    pub fn same_times(&self, other: &TimeSlot) -> bool {
        self.day == other.day && self.start == other.start && self.end == other.end
    }

    pub fn duration_minutes(&self) -> i32 {
        self.start.minutes_until(self.end)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{}", self.day, self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TimeInterval {
    #[serde(flatten)]
    pub slot: TimeSlot,
    pub room: RoomCode,
}

impl TimeInterval {
    pub fn new(day: DayOfWeek, start: ClockTime, end: ClockTime, room: RoomCode) -> Self {
        Self {
            slot: TimeSlot::new(day, start, end),
            room,
        }
    }

    pub fn day(&self) -> DayOfWeek {
        self.slot.day
    }

    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.slot.overlaps(&other.slot)
    }

    pub fn same_room(&self, other: &TimeInterval) -> bool {
        self.room.matches(&other.room)
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.slot, self.room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    fn slot(day: DayOfWeek, start: &str, end: &str) -> TimeSlot {
        TimeSlot::new(day, at(start), at(end))
    }

    #[test]
    fn different_days_never_overlap() {
        let a = slot(DayOfWeek::Monday, "08:00", "10:00");
        let b = slot(DayOfWeek::Tuesday, "08:00", "10:00");
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = slot(DayOfWeek::Monday, "08:00", "10:00");
        let b = slot(DayOfWeek::Monday, "09:00", "11:00");
        let c = slot(DayOfWeek::Monday, "08:30", "09:00");
        assert!(a.overlaps(&b) && b.overlaps(&a));
        assert!(a.overlaps(&c) && c.overlaps(&a));
        assert!(!b.overlaps(&c) && !c.overlaps(&b));
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let a = slot(DayOfWeek::Monday, "08:00", "10:00");
        let b = slot(DayOfWeek::Monday, "10:00", "12:00");
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn identical_intervals_overlap() {
        let a = slot(DayOfWeek::Friday, "13:15", "14:45");
        assert!(a.overlaps(&a));
        assert!(a.same_times(&a));
    }

    #[test]
    fn same_room_ignores_case() {
        let a = TimeInterval::new(DayOfWeek::Monday, at("08:00"), at("09:00"), RoomCode::new("a203"));
        let b = TimeInterval::new(DayOfWeek::Monday, at("08:00"), at("09:00"), RoomCode::new("A203"));
        assert!(a.same_room(&b));
    }

    #[test]
    fn day_names_are_case_insensitive_full_names() {
        assert_eq!("MONDAY".parse::<DayOfWeek>().unwrap(), DayOfWeek::Monday);
        assert_eq!("Sunday".parse::<DayOfWeek>().unwrap(), DayOfWeek::Sunday);
        assert!("Mon".parse::<DayOfWeek>().is_err());
        assert!("funday".parse::<DayOfWeek>().is_err());
    }

    #[test]
    fn strict_time_requires_zero_padding() {
        assert!(ClockTime::parse_strict("08:00").is_ok());
        assert!(ClockTime::parse_strict("23:59").is_ok());
        assert!(ClockTime::parse_strict("8:00").is_err());
        assert!(ClockTime::parse_strict("25:00").is_err());
        assert!(ClockTime::parse_strict("12:60").is_err());
    }

    #[test]
    fn lenient_time_canonicalizes() {
        assert_eq!(at("8:05").to_string(), "08:05");
        assert!("24:00".parse::<ClockTime>().is_err());
        assert!("800".parse::<ClockTime>().is_err());
    }

    #[test]
    fn numeric_order_matches_padded_string_order() {
        let times = ["00:00", "07:59", "08:00", "09:30", "10:00", "23:59"];
        for a in times {
            for b in times {
                assert_eq!(at(a).cmp(&at(b)), a.cmp(b), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn room_code_pattern() {
        assert!(RoomCode::is_well_formed("A203"));
        assert!(!RoomCode::is_well_formed("a203"));
        assert!(!RoomCode::is_well_formed("A20"));
        assert!(!RoomCode::is_well_formed("AB203"));
    }
}
