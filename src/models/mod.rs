pub mod class;
pub mod enrollment;
pub mod interval;
pub mod people;
pub mod schedule;

pub use class::{Class, ClassRecord, ClassRequest};
pub use enrollment::{Enrollment, EnrollmentRow, InvalidEnrollmentRow, NewEnrollmentRequest};
pub use interval::{
    ClockTime, DayOfWeek, MalformedTimeError, ROOM_CODE_RE, RoomCode, STRICT_TIME_RE, TimeInterval, TimeSlot,
    UnknownDayError,
};
pub use people::{NewStudentRequest, NewTeacherRequest, Student, Teacher};
pub use schedule::{Schedule, ScheduleFormatError, Session};
