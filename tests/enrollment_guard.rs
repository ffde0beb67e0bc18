use std::sync::Arc;

use async_trait::async_trait;
use class_scheduler::db::{ScheduleStore, SqliteStore, StoreError};
use class_scheduler::error::Entity;
use class_scheduler::models::{Class, ClassRecord, Enrollment, Schedule, Student, Teacher, TimeInterval, TimeSlot};
use class_scheduler::services::{BookingLocks, EnrollmentError, EnrollmentGuard};
use class_scheduler::validation::{SlotRule, validate_interval};
use serde_json::json;

struct Fixture {
    store: Arc<SqliteStore>,
    guard: EnrollmentGuard,
    student: Student,
    class_1: Class,
    class_2: Class,
}

async fn setup() -> Fixture {
    let store = Arc::new(
        SqliteStore::connect("sqlite::memory:", 1)
            .await
            .expect("Failed to create database"),
    );

    let teacher = store
        .save_teacher(&Teacher::new("T1".to_string(), None))
        .await
        .expect("Failed to save teacher");
    let student = store
        .save_student(&Student::new("S".to_string(), "s@example.com".to_string()))
        .await
        .expect("Failed to save student");

    let schedule = Schedule::from_value(&json!({
        "monday": [{ "room": "A203", "start": "08:00", "end": "10:00" }]
    }))
    .expect("Invalid schedule fixture");
    let class_1 = store
        .save_class(&Class::new("Class 1".to_string(), None, teacher.id.clone(), schedule.clone()))
        .await
        .expect("Failed to save class");
    let class_2 = store
        .save_class(&Class::new("Class 2".to_string(), None, teacher.id.clone(), schedule))
        .await
        .expect("Failed to save class");

    let guard = EnrollmentGuard::new(store.clone(), Arc::new(BookingLocks::new()));
    Fixture {
        store,
        guard,
        student,
        class_1,
        class_2,
    }
}

fn slot(day: &str, start: &str, end: &str) -> TimeInterval {
    validate_interval(day, start, end, "A203", SlotRule::Enrollment).expect("Invalid slot")
}

#[tokio::test]
async fn test_enroll_persists_row() {
    let f = setup().await;

    let saved = f
        .guard
        .try_enroll(&f.student.id, &f.class_1.id, slot("monday", "08:00", "10:00"))
        .await
        .expect("Enrollment should succeed");

    let found = f
        .store
        .find_enrollment_by_id(&saved.id)
        .await
        .expect("Lookup failed")
        .expect("Enrollment not stored");
    assert_eq!(found, saved);
}

#[tokio::test]
async fn test_exact_repeat_in_same_class_is_duplicate() {
    let f = setup().await;
    f.guard
        .try_enroll(&f.student.id, &f.class_1.id, slot("monday", "08:00", "10:00"))
        .await
        .expect("First enrollment should succeed");

    let err = f
        .guard
        .try_enroll(&f.student.id, &f.class_1.id, slot("monday", "08:00", "10:00"))
        .await
        .expect_err("Repeat must be refused");

    assert!(matches!(err, EnrollmentError::Duplicate));
}

#[tokio::test]
async fn test_same_times_in_other_class_is_schedule_conflict() {
    let f = setup().await;
    let first = f
        .guard
        .try_enroll(&f.student.id, &f.class_1.id, slot("monday", "08:00", "10:00"))
        .await
        .expect("First enrollment should succeed");

    let err = f
        .guard
        .try_enroll(&f.student.id, &f.class_2.id, slot("monday", "08:00", "10:00"))
        .await
        .expect_err("Overlap must be refused");

    match err {
        EnrollmentError::ScheduleConflict { conflicts, .. } => {
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].id, first.id);
        }
        other => panic!("expected schedule conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_partial_overlap_is_schedule_conflict() {
    let f = setup().await;
    f.guard
        .try_enroll(&f.student.id, &f.class_1.id, slot("monday", "08:00", "10:00"))
        .await
        .expect("First enrollment should succeed");

    let err = f
        .guard
        .try_enroll(&f.student.id, &f.class_2.id, slot("monday", "09:30", "11:00"))
        .await
        .expect_err("Overlap must be refused");

    assert!(matches!(err, EnrollmentError::ScheduleConflict { .. }));
}

#[tokio::test]
async fn test_touching_and_other_day_enrollments_are_accepted() {
    let f = setup().await;
    f.guard
        .try_enroll(&f.student.id, &f.class_1.id, slot("monday", "08:00", "10:00"))
        .await
        .expect("First enrollment should succeed");

    f.guard
        .try_enroll(&f.student.id, &f.class_2.id, slot("monday", "10:00", "11:00"))
        .await
        .expect("Touching slot should be accepted");
    f.guard
        .try_enroll(&f.student.id, &f.class_2.id, slot("tuesday", "08:00", "10:00"))
        .await
        .expect("Other day should be accepted");

    let all = f
        .store
        .find_enrollments_by_student(&f.student.id)
        .await
        .expect("Lookup failed");
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_unknown_student_or_class_is_not_found() {
    let f = setup().await;

    let err = f
        .guard
        .try_enroll("missing", &f.class_1.id, slot("monday", "08:00", "10:00"))
        .await
        .expect_err("Unknown student must be refused");
    assert!(matches!(err, EnrollmentError::NotFound { entity: Entity::Student, .. }));

    let err = f
        .guard
        .try_enroll(&f.student.id, "missing", slot("monday", "08:00", "10:00"))
        .await
        .expect_err("Unknown class must be refused");
    assert!(matches!(err, EnrollmentError::NotFound { entity: Entity::Class, .. }));
}

#[tokio::test]
async fn test_delete_by_pair() {
    let f = setup().await;
    let saved = f
        .guard
        .try_enroll(&f.student.id, &f.class_1.id, slot("monday", "08:00", "10:00"))
        .await
        .expect("Enrollment should succeed");

    let removed = f
        .guard
        .delete_by_student_and_class(&f.student.id, &f.class_1.id)
        .await
        .expect("Pair deletion should succeed");
    assert_eq!(removed.id, saved.id);

    let err = f
        .guard
        .delete_by_student_and_class(&f.student.id, &f.class_1.id)
        .await
        .expect_err("Nothing left to delete");
    assert!(matches!(err, EnrollmentError::NotFound { entity: Entity::Enrollment, .. }));
}

#[tokio::test]
async fn test_delete_by_pair_refuses_ambiguous_match() {
    let f = setup().await;
    f.guard
        .try_enroll(&f.student.id, &f.class_1.id, slot("monday", "08:00", "09:00"))
        .await
        .expect("Enrollment should succeed");
    f.guard
        .try_enroll(&f.student.id, &f.class_1.id, slot("wednesday", "08:00", "09:00"))
        .await
        .expect("Enrollment should succeed");

    let err = f
        .guard
        .delete_by_student_and_class(&f.student.id, &f.class_1.id)
        .await
        .expect_err("Ambiguous deletion must be refused");
    assert!(matches!(err, EnrollmentError::AmbiguousDeletion { count: 2 }));
}

#[tokio::test]
async fn test_deleting_class_removes_its_enrollments() {
    let f = setup().await;
    let saved = f
        .guard
        .try_enroll(&f.student.id, &f.class_1.id, slot("monday", "08:00", "10:00"))
        .await
        .expect("Enrollment should succeed");

    assert!(f.store.delete_class(&f.class_1.id).await.expect("Delete failed"));
    assert!(
        f.store
            .find_enrollment_by_id(&saved.id)
            .await
            .expect("Lookup failed")
            .is_none()
    );
}

/// Store whose exact-duplicate lookup never matches, so the unique constraint
/// on `enrollments` is the only thing left to catch a repeat.
struct MissingDuplicateLookup(Arc<SqliteStore>);

#[async_trait]
impl ScheduleStore for MissingDuplicateLookup {
    async fn ping(&self) -> Result<(), StoreError> {
        self.0.ping().await
    }
    async fn find_all_classes(&self) -> Result<Vec<ClassRecord>, StoreError> {
        self.0.find_all_classes().await
    }
    async fn find_classes_by_teacher(&self, teacher_id: &str) -> Result<Vec<ClassRecord>, StoreError> {
        self.0.find_classes_by_teacher(teacher_id).await
    }
    async fn find_class_by_id(&self, id: &str) -> Result<Option<ClassRecord>, StoreError> {
        self.0.find_class_by_id(id).await
    }
    async fn save_class(&self, class: &Class) -> Result<Class, StoreError> {
        self.0.save_class(class).await
    }
    async fn delete_class(&self, id: &str) -> Result<bool, StoreError> {
        self.0.delete_class(id).await
    }
    async fn find_teacher_by_id(&self, id: &str) -> Result<Option<Teacher>, StoreError> {
        self.0.find_teacher_by_id(id).await
    }
    async fn save_teacher(&self, teacher: &Teacher) -> Result<Teacher, StoreError> {
        self.0.save_teacher(teacher).await
    }
    async fn find_student_by_id(&self, id: &str) -> Result<Option<Student>, StoreError> {
        self.0.find_student_by_id(id).await
    }
    async fn save_student(&self, student: &Student) -> Result<Student, StoreError> {
        self.0.save_student(student).await
    }
    async fn find_enrollment_by_id(&self, id: &str) -> Result<Option<Enrollment>, StoreError> {
        self.0.find_enrollment_by_id(id).await
    }
    async fn find_enrollments_by_student(&self, student_id: &str) -> Result<Vec<Enrollment>, StoreError> {
        self.0.find_enrollments_by_student(student_id).await
    }
    async fn find_enrollments_by_class(&self, class_id: &str) -> Result<Vec<Enrollment>, StoreError> {
        self.0.find_enrollments_by_class(class_id).await
    }
    async fn find_enrollments_by_student_and_class(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Vec<Enrollment>, StoreError> {
        self.0.find_enrollments_by_student_and_class(student_id, class_id).await
    }
    async fn exists_exact_enrollment(
        &self,
        _student_id: &str,
        _class_id: &str,
        _slot: &TimeSlot,
    ) -> Result<bool, StoreError> {
        Ok(false)
    }
    async fn save_enrollment(&self, enrollment: &Enrollment) -> Result<Enrollment, StoreError> {
        self.0.save_enrollment(enrollment).await
    }
    async fn delete_enrollment(&self, id: &str) -> Result<bool, StoreError> {
        self.0.delete_enrollment(id).await
    }
}

#[tokio::test]
async fn test_unique_constraint_reports_duplicate() {
    let f = setup().await;
    f.guard
        .try_enroll(&f.student.id, &f.class_1.id, slot("monday", "08:00", "10:00"))
        .await
        .expect("First enrollment should succeed");

    let blind = EnrollmentGuard::new(
        Arc::new(MissingDuplicateLookup(f.store.clone())),
        Arc::new(BookingLocks::new()),
    );
    let err = blind
        .try_enroll(&f.student.id, &f.class_1.id, slot("monday", "08:00", "10:00"))
        .await
        .expect_err("Unique constraint must refuse the repeat");
    assert!(matches!(err, EnrollmentError::Duplicate));

    let rows = f
        .store
        .find_enrollments_by_student(&f.student.id)
        .await
        .expect("Lookup failed");
    assert_eq!(rows.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overlapping_enrollments_admit_one() {
    let f = setup().await;
    let guard = Arc::new(f.guard);

    let mut handles = Vec::new();
    for i in 0..20 {
        let guard = guard.clone();
        let student_id = f.student.id.clone();
        let class_id = if i % 2 == 0 { f.class_1.id.clone() } else { f.class_2.id.clone() };
        handles.push(tokio::spawn(async move {
            let start = format!("08:{i:02}");
            let end = format!("10:{i:02}");
            guard
                .try_enroll(&student_id, &class_id, slot("monday", &start, &end))
                .await
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        match handle.await.expect("Task panicked") {
            Ok(_) => admitted += 1,
            Err(EnrollmentError::ScheduleConflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(admitted, 1);

    let rows = f
        .store
        .find_enrollments_by_student(&f.student.id)
        .await
        .expect("Lookup failed");
    assert_eq!(rows.len(), 1);
}
