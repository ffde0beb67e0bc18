use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use validator::Validate;

use crate::db::{ScheduleStore, StoreError};
use crate::error::{AppError, Entity};
use crate::models::{Class, ClassRecord, ClassRequest, Schedule, Teacher};
use crate::services::conflict::ConflictDetector;
use crate::services::locks::{BookingLocks, LockKey};
use crate::validation::{from_validation_errors, validate_schedule};

struct PreparedClass {
    title: String,
    subject: Option<String>,
    teacher: Teacher,
    schedule: Schedule,
}

pub struct ClassService {
    store: Arc<dyn ScheduleStore>,
    locks: Arc<BookingLocks>,
    detector: ConflictDetector,
}

impl ClassService {
    pub fn new(store: Arc<dyn ScheduleStore>, locks: Arc<BookingLocks>) -> Self {
        let detector = ConflictDetector::new(store.clone());
        Self {
            store,
            locks,
            detector,
        }
    }

    /// All classes whose stored schedule is readable.
    pub async fn list(&self) -> Result<Vec<Class>, AppError> {
        Ok(readable(self.store.find_all_classes().await?))
    }

    pub async fn list_by_teacher(&self, teacher_id: &str) -> Result<Vec<Class>, AppError> {
        self.store
            .find_teacher_by_id(teacher_id)
            .await?
            .ok_or(AppError::NotFound(Entity::Teacher))?;
        Ok(readable(self.store.find_classes_by_teacher(teacher_id).await?))
    }

    pub async fn get(&self, id: &str) -> Result<Class, AppError> {
        let record = self
            .store
            .find_class_by_id(id)
            .await?
            .ok_or(AppError::NotFound(Entity::Class))?;
        record.into_class().map_err(|e| {
            AppError::Store(StoreError::CorruptRow {
                id: id.to_string(),
                reason: e.to_string(),
            })
        })
    }

    pub async fn create(&self, req: ClassRequest) -> Result<Class, AppError> {
        let prepared = self.prepare(req).await?;
        let mut class = Class::new(
            prepared.title,
            prepared.subject,
            prepared.teacher.id,
            prepared.schedule,
        );
        class.teacher_name = Some(prepared.teacher.name);

        let saved = self.commit(class, None).await?;
        info!(class_id = %saved.id, sessions = saved.schedule.len(), "class created");
        Ok(saved)
    }

    /// Replaces title, teacher and the whole schedule. The class's own current
    /// sessions do not count as conflicts.
    pub async fn update(&self, id: &str, req: ClassRequest) -> Result<Class, AppError> {
        let existing = self
            .store
            .find_class_by_id(id)
            .await?
            .ok_or(AppError::NotFound(Entity::Class))?;
        let prepared = self.prepare(req).await?;

        let class = Class {
            id: existing.id,
            title: prepared.title,
            subject: prepared.subject,
            teacher_id: Some(prepared.teacher.id),
            teacher_name: Some(prepared.teacher.name),
            schedule: prepared.schedule,
            created_at: existing.created_at,
            updated_at: Utc::now().to_rfc3339(),
        };

        let saved = self.commit(class, Some(id)).await?;
        info!(class_id = %saved.id, sessions = saved.schedule.len(), "class schedule replaced");
        Ok(saved)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if self.store.delete_class(id).await? {
            info!(class_id = id, "class deleted");
            Ok(())
        } else {
            Err(AppError::NotFound(Entity::Class))
        }
    }

    async fn prepare(&self, req: ClassRequest) -> Result<PreparedClass, AppError> {
        let mut errors = req
            .validate()
            .err()
            .map(|e| from_validation_errors(&e))
            .unwrap_or_default();
        let schedule = match validate_schedule(&req.schedule) {
            Ok(schedule) => Some(schedule),
            Err(found) => {
                errors.extend(found);
                None
            }
        };
        let Some(schedule) = schedule.filter(|_| errors.is_empty()) else {
            return Err(AppError::Validation(errors));
        };

        let teacher_id = req
            .teacher_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::BadRequest("Teacher not found".to_string()))?;
        let teacher = self
            .store
            .find_teacher_by_id(teacher_id)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("Teacher not found with id: {teacher_id}")))?;

        Ok(PreparedClass {
            title: req.title.trim().to_string(),
            subject: req.subject,
            teacher,
            schedule,
        })
    }

    /// Checks the schedule against every other class and saves it, holding the
    /// locks of its rooms and teacher throughout.
    async fn commit(&self, class: Class, exclude_class_id: Option<&str>) -> Result<Class, AppError> {
        let mut keys: Vec<LockKey> = class.schedule.rooms().into_iter().map(LockKey::Room).collect();
        if let Some(teacher_id) = &class.teacher_id {
            keys.push(LockKey::Teacher(teacher_id.clone()));
        }
        let _guard = self.locks.acquire(keys).await;

        let report = self
            .detector
            .check_schedule(&class.schedule, class.teacher_id.as_deref(), exclude_class_id)
            .await?;
        if report.has_conflicts() {
            warn!(
                class_id = %class.id,
                room = report.room_conflicts.len(),
                teacher = report.teacher_conflicts.len(),
                "class schedule rejected"
            );
            return Err(AppError::ScheduleConflict(report.messages()));
        }

        Ok(self.store.save_class(&class).await?)
    }
}

fn readable(records: Vec<ClassRecord>) -> Vec<Class> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.id.clone();
            record
                .into_class()
                .inspect_err(|e| warn!(class_id = %id, error = %e, "unreadable stored schedule"))
                .ok()
        })
        .collect()
}
