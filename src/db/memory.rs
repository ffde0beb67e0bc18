use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{ScheduleStore, StoreError};
use crate::models::{Class, ClassRecord, Enrollment, Student, Teacher, TimeSlot};

#[derive(Default)]
struct Tables {
    teachers: Vec<Teacher>,
    students: Vec<Student>,
    classes: Vec<ClassRecord>,
    enrollments: Vec<Enrollment>,
}

impl Tables {
    fn with_teacher_name(&self, record: &ClassRecord) -> ClassRecord {
        let mut record = record.clone();
        record.teacher_name = record
            .teacher_id
            .as_deref()
            .and_then(|id| self.teachers.iter().find(|t| t.id == id))
            .map(|t| t.name.clone());
        record
    }

    fn classes_where(&self, keep: impl Fn(&ClassRecord) -> bool) -> Vec<ClassRecord> {
        self.classes
            .iter()
            .filter(|c| keep(c))
            .map(|c| self.with_teacher_name(c))
            .collect()
    }

    fn enrollments_where(&self, keep: impl Fn(&Enrollment) -> bool) -> Vec<Enrollment> {
        self.enrollments.iter().filter(|e| keep(e)).cloned().collect()
    }
}

/// Process-local store with the same uniqueness rules as the SQLite schema.
/// Rows keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a class row verbatim, schedule text included, without parsing it.
    pub async fn insert_raw_class(&self, record: ClassRecord) {
        let mut tables = self.tables.write().await;
        tables.classes.retain(|c| c.id != record.id);
        tables.classes.push(record);
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_all_classes(&self) -> Result<Vec<ClassRecord>, StoreError> {
        Ok(self.tables.read().await.classes_where(|_| true))
    }

    async fn find_classes_by_teacher(&self, teacher_id: &str) -> Result<Vec<ClassRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.classes_where(|c| c.teacher_id.as_deref() == Some(teacher_id)))
    }

    async fn find_class_by_id(&self, id: &str) -> Result<Option<ClassRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.classes.iter().find(|c| c.id == id).map(|c| tables.with_teacher_name(c)))
    }

    async fn save_class(&self, class: &Class) -> Result<Class, StoreError> {
        let mut tables = self.tables.write().await;
        let mut record = class.to_record();
        record.updated_at = Utc::now().to_rfc3339();

        match tables.classes.iter_mut().find(|c| c.id == class.id) {
            Some(existing) => {
                record.created_at = existing.created_at.clone();
                *existing = record.clone();
            }
            None => tables.classes.push(record.clone()),
        }

        tables
            .with_teacher_name(&record)
            .into_class()
            .map_err(|e| StoreError::CorruptRow {
                id: record.id.clone(),
                reason: e.to_string(),
            })
    }

    async fn delete_class(&self, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.classes.len();
        tables.classes.retain(|c| c.id != id);
        tables.enrollments.retain(|e| e.class_id != id);
        Ok(tables.classes.len() < before)
    }

    async fn find_teacher_by_id(&self, id: &str) -> Result<Option<Teacher>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.teachers.iter().find(|t| t.id == id).cloned())
    }

    async fn save_teacher(&self, teacher: &Teacher) -> Result<Teacher, StoreError> {
        let mut tables = self.tables.write().await;
        tables.teachers.retain(|t| t.id != teacher.id);
        tables.teachers.push(teacher.clone());
        Ok(teacher.clone())
    }

    async fn find_student_by_id(&self, id: &str) -> Result<Option<Student>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.students.iter().find(|s| s.id == id).cloned())
    }

    async fn save_student(&self, student: &Student) -> Result<Student, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .students
            .iter()
            .any(|s| s.id != student.id && s.email == student.email)
        {
            return Err(StoreError::UniqueViolation("students.email".to_string()));
        }
        tables.students.retain(|s| s.id != student.id);
        tables.students.push(student.clone());
        Ok(student.clone())
    }

    async fn find_enrollment_by_id(&self, id: &str) -> Result<Option<Enrollment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.enrollments.iter().find(|e| e.id == id).cloned())
    }

    async fn find_enrollments_by_student(&self, student_id: &str) -> Result<Vec<Enrollment>, StoreError> {
        Ok(self.tables.read().await.enrollments_where(|e| e.student_id == student_id))
    }

    async fn find_enrollments_by_class(&self, class_id: &str) -> Result<Vec<Enrollment>, StoreError> {
        Ok(self.tables.read().await.enrollments_where(|e| e.class_id == class_id))
    }

    async fn find_enrollments_by_student_and_class(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Vec<Enrollment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.enrollments_where(|e| e.student_id == student_id && e.class_id == class_id))
    }

    async fn exists_exact_enrollment(
        &self,
        student_id: &str,
        class_id: &str,
        slot: &TimeSlot,
    ) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.enrollments.iter().any(|e| {
            e.student_id == student_id && e.class_id == class_id && e.interval.slot.same_times(slot)
        }))
    }

    async fn save_enrollment(&self, enrollment: &Enrollment) -> Result<Enrollment, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.enrollments.iter().any(|e| {
            e.is_exact_duplicate_of(&enrollment.student_id, &enrollment.class_id, &enrollment.interval)
        }) {
            return Err(StoreError::UniqueViolation(
                "enrollments.student_id, enrollments.class_id, enrollments.day, enrollments.start_time, enrollments.end_time"
                    .to_string(),
            ));
        }
        tables.enrollments.push(enrollment.clone());
        Ok(enrollment.clone())
    }

    async fn delete_enrollment(&self, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.enrollments.len();
        tables.enrollments.retain(|e| e.id != id);
        Ok(tables.enrollments.len() < before)
    }
}
