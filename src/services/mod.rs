pub mod classes;
pub mod conflict;
pub mod enrollment;
pub mod locks;

pub use classes::ClassService;
pub use conflict::{ConflictDetector, ConflictReport, RoomConflict, SkippedClass, TeacherConflict};
pub use enrollment::{EnrollmentError, EnrollmentGuard};
pub use locks::{BookingGuard, BookingLocks, LockKey};
