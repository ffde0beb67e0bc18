//! Storage collaborator: lookups, saves and deletes keyed by identifier.

pub mod memory;
pub mod repository;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Class, ClassRecord, Enrollment, Student, Teacher, TimeSlot};

pub use memory::MemoryStore;
pub use repository::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("stored row {id} is unreadable: {reason}")]
    CorruptRow { id: String, reason: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(db_err.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_all_classes(&self) -> Result<Vec<ClassRecord>, StoreError>;
    async fn find_classes_by_teacher(&self, teacher_id: &str) -> Result<Vec<ClassRecord>, StoreError>;
    async fn find_class_by_id(&self, id: &str) -> Result<Option<ClassRecord>, StoreError>;
    /// Inserts or replaces the class; the schedule is written in its persisted text form.
    async fn save_class(&self, class: &Class) -> Result<Class, StoreError>;
    /// Removes the class together with its enrollments.
    async fn delete_class(&self, id: &str) -> Result<bool, StoreError>;

    async fn find_teacher_by_id(&self, id: &str) -> Result<Option<Teacher>, StoreError>;
    async fn save_teacher(&self, teacher: &Teacher) -> Result<Teacher, StoreError>;
    async fn find_student_by_id(&self, id: &str) -> Result<Option<Student>, StoreError>;
    async fn save_student(&self, student: &Student) -> Result<Student, StoreError>;

    async fn find_enrollment_by_id(&self, id: &str) -> Result<Option<Enrollment>, StoreError>;
    async fn find_enrollments_by_student(&self, student_id: &str) -> Result<Vec<Enrollment>, StoreError>;
    async fn find_enrollments_by_class(&self, class_id: &str) -> Result<Vec<Enrollment>, StoreError>;
    async fn find_enrollments_by_student_and_class(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Vec<Enrollment>, StoreError>;
    async fn exists_exact_enrollment(
        &self,
        student_id: &str,
        class_id: &str,
        slot: &TimeSlot,
    ) -> Result<bool, StoreError>;
    /// Fails with [`StoreError::UniqueViolation`] on an identical
    /// (student, class, day, start, end) row.
    async fn save_enrollment(&self, enrollment: &Enrollment) -> Result<Enrollment, StoreError>;
    async fn delete_enrollment(&self, id: &str) -> Result<bool, StoreError>;
}
