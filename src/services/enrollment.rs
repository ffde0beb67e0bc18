use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::db::{ScheduleStore, StoreError};
use crate::error::{AppError, Entity};
use crate::models::{DayOfWeek, Enrollment, TimeInterval};
use crate::services::locks::{BookingLocks, LockKey};

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("{entity} not found with id: {id}")]
    NotFound { entity: Entity, id: String },

    #[error("Student already enrolled in this exact time slot")]
    Duplicate,

    #[error("Schedule conflict: student has an overlapping time slot on {day}")]
    ScheduleConflict {
        day: DayOfWeek,
        conflicts: Vec<Enrollment>,
    },

    #[error("Student has {count} time-slot enrollments in this class; delete one by id")]
    AmbiguousDeletion { count: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<EnrollmentError> for AppError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::NotFound {
                entity: Entity::Enrollment,
                ..
            } => AppError::NotFound(Entity::Enrollment),
            // a missing student or class is a problem with the request body
            EnrollmentError::NotFound { .. } => AppError::BadRequest(err.to_string()),
            EnrollmentError::ScheduleConflict { ref conflicts, .. } => {
                let listed = conflicts
                    .iter()
                    .map(|e| format!("enrollment {} (class {}) on {}", e.id, e.class_id, e.interval))
                    .collect();
                AppError::EnrollmentConflict {
                    message: err.to_string(),
                    conflicts: listed,
                }
            }
            EnrollmentError::Duplicate | EnrollmentError::AmbiguousDeletion { .. } => {
                AppError::Conflict(err.to_string())
            }
            EnrollmentError::Store(e) => AppError::Store(e),
        }
    }
}

/// Admits a student into one time slot of a class.
///
/// Identical (student, class, day, start, end) rows are refused as duplicates;
/// any other overlap with the student's existing enrollments, in any class, is
/// a schedule conflict. Both checks and the write run under the student's lock.
pub struct EnrollmentGuard {
    store: Arc<dyn ScheduleStore>,
    locks: Arc<BookingLocks>,
}

impl EnrollmentGuard {
    pub fn new(store: Arc<dyn ScheduleStore>, locks: Arc<BookingLocks>) -> Self {
        Self { store, locks }
    }

    pub async fn try_enroll(
        &self,
        student_id: &str,
        class_id: &str,
        interval: TimeInterval,
    ) -> Result<Enrollment, EnrollmentError> {
        let _guard = self
            .locks
            .acquire([LockKey::Student(student_id.to_string())])
            .await;

        if self.store.find_student_by_id(student_id).await?.is_none() {
            return Err(EnrollmentError::NotFound {
                entity: Entity::Student,
                id: student_id.to_string(),
            });
        }
        if self.store.find_class_by_id(class_id).await?.is_none() {
            return Err(EnrollmentError::NotFound {
                entity: Entity::Class,
                id: class_id.to_string(),
            });
        }

        if self
            .store
            .exists_exact_enrollment(student_id, class_id, &interval.slot)
            .await?
        {
            warn!(student_id, class_id, slot = %interval.slot, "duplicate enrollment refused");
            return Err(EnrollmentError::Duplicate);
        }

        let conflicts: Vec<Enrollment> = self
            .store
            .find_enrollments_by_student(student_id)
            .await?
            .into_iter()
            .filter(|existing| existing.interval.overlaps(&interval))
            .filter(|existing| !existing.is_exact_duplicate_of(student_id, class_id, &interval))
            .collect();
        if !conflicts.is_empty() {
            warn!(
                student_id,
                class_id,
                slot = %interval.slot,
                collisions = conflicts.len(),
                "overlapping enrollment refused"
            );
            return Err(EnrollmentError::ScheduleConflict {
                day: interval.day(),
                conflicts,
            });
        }

        let enrollment = Enrollment::new(student_id, class_id, interval);
        let saved = match self.store.save_enrollment(&enrollment).await {
            Ok(saved) => saved,
            Err(StoreError::UniqueViolation(_)) => return Err(EnrollmentError::Duplicate),
            Err(e) => return Err(e.into()),
        };

        info!(
            enrollment_id = %saved.id,
            student_id,
            class_id,
            slot = %saved.interval,
            "enrollment created"
        );
        Ok(saved)
    }

    pub async fn delete(&self, enrollment_id: &str) -> Result<(), EnrollmentError> {
        if self.store.delete_enrollment(enrollment_id).await? {
            info!(enrollment_id, "enrollment deleted");
            Ok(())
        } else {
            Err(EnrollmentError::NotFound {
                entity: Entity::Enrollment,
                id: enrollment_id.to_string(),
            })
        }
    }

    /// Deletes the single enrollment of `student_id` in `class_id`. Refuses
    /// when the student holds several time slots of that class.
    pub async fn delete_by_student_and_class(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Enrollment, EnrollmentError> {
        let _guard = self
            .locks
            .acquire([LockKey::Student(student_id.to_string())])
            .await;

        let mut matches = self
            .store
            .find_enrollments_by_student_and_class(student_id, class_id)
            .await?;

        match matches.len() {
            0 => Err(EnrollmentError::NotFound {
                entity: Entity::Enrollment,
                id: format!("student {student_id} / class {class_id}"),
            }),
            1 => {
                let enrollment = matches.remove(0);
                self.store.delete_enrollment(&enrollment.id).await?;
                info!(enrollment_id = %enrollment.id, student_id, class_id, "enrollment deleted by pair");
                Ok(enrollment)
            }
            count => Err(EnrollmentError::AmbiguousDeletion { count }),
        }
    }
}
