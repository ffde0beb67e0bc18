use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::{ScheduleStore, StoreError};
use crate::models::{Class, ClassRecord, Enrollment, EnrollmentRow, Student, Teacher, TimeSlot};

#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Opens the pool, creating the database file if needed, and applies migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // an in-memory database lives only as long as its connection
        let db = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&db).await?;

        Ok(Self::new(db))
    }

}

fn decode_enrollment(row: EnrollmentRow) -> Result<Enrollment, StoreError> {
    let id = row.id.clone();
    Enrollment::try_from(row).map_err(|e| StoreError::CorruptRow {
        id,
        reason: e.to_string(),
    })
}

fn decode_enrollments(rows: Vec<EnrollmentRow>) -> Result<Vec<Enrollment>, StoreError> {
    rows.into_iter().map(decode_enrollment).collect()
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("select 1").execute(&self.db).await?;
        Ok(())
    }

    async fn find_all_classes(&self) -> Result<Vec<ClassRecord>, StoreError> {
        let records = sqlx::query_as::<_, ClassRecord>(
            r#"
            SELECT c.id, c.title, c.subject, c.teacher_id, t.name AS teacher_name,
                   c.schedule, c.created_at, c.updated_at
            FROM classes c
            LEFT JOIN teachers t ON t.id = c.teacher_id
            ORDER BY c.created_at, c.id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(records)
    }

    async fn find_classes_by_teacher(&self, teacher_id: &str) -> Result<Vec<ClassRecord>, StoreError> {
        let records = sqlx::query_as::<_, ClassRecord>(
            r#"
            SELECT c.id, c.title, c.subject, c.teacher_id, t.name AS teacher_name,
                   c.schedule, c.created_at, c.updated_at
            FROM classes c
            LEFT JOIN teachers t ON t.id = c.teacher_id
            WHERE c.teacher_id = ?
            ORDER BY c.created_at, c.id
            "#,
        )
        .bind(teacher_id)
        .fetch_all(&self.db)
        .await?;
        Ok(records)
    }

    async fn find_class_by_id(&self, id: &str) -> Result<Option<ClassRecord>, StoreError> {
        let record = sqlx::query_as::<_, ClassRecord>(
            r#"
            SELECT c.id, c.title, c.subject, c.teacher_id, t.name AS teacher_name,
                   c.schedule, c.created_at, c.updated_at
            FROM classes c
            LEFT JOIN teachers t ON t.id = c.teacher_id
            WHERE c.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(record)
    }

    async fn save_class(&self, class: &Class) -> Result<Class, StoreError> {
        let schedule = class.schedule.serialize();
        let now = Utc::now().to_rfc3339();

        match self.find_class_by_id(&class.id).await? {
            Some(_) => {
                sqlx::query(
                    "UPDATE classes SET title = ?, subject = ?, teacher_id = ?, schedule = ?, updated_at = ? WHERE id = ?",
                )
                .bind(&class.title)
                .bind(&class.subject)
                .bind(&class.teacher_id)
                .bind(&schedule)
                .bind(&now)
                .bind(&class.id)
                .execute(&self.db)
                .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO classes (id, title, subject, teacher_id, schedule, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&class.id)
                .bind(&class.title)
                .bind(&class.subject)
                .bind(&class.teacher_id)
                .bind(&schedule)
                .bind(&class.created_at)
                .bind(&now)
                .execute(&self.db)
                .await?;
            }
        }

        let record = self
            .find_class_by_id(&class.id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        let id = record.id.clone();
        record.into_class().map_err(|e| StoreError::CorruptRow {
            id,
            reason: e.to_string(),
        })
    }

    async fn delete_class(&self, id: &str) -> Result<bool, StoreError> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM enrollments WHERE class_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM classes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn find_teacher_by_id(&self, id: &str) -> Result<Option<Teacher>, StoreError> {
        let teacher = sqlx::query_as::<_, Teacher>(
            "SELECT id, name, subject, created_at FROM teachers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(teacher)
    }

    async fn save_teacher(&self, teacher: &Teacher) -> Result<Teacher, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO teachers (id, name, subject, created_at) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, subject = excluded.subject
            "#,
        )
        .bind(&teacher.id)
        .bind(&teacher.name)
        .bind(&teacher.subject)
        .bind(&teacher.created_at)
        .execute(&self.db)
        .await?;
        Ok(teacher.clone())
    }

    async fn find_student_by_id(&self, id: &str) -> Result<Option<Student>, StoreError> {
        let student = sqlx::query_as::<_, Student>(
            "SELECT id, name, email, created_at FROM students WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(student)
    }

    async fn save_student(&self, student: &Student) -> Result<Student, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO students (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email
            "#,
        )
        .bind(&student.id)
        .bind(&student.name)
        .bind(&student.email)
        .bind(&student.created_at)
        .execute(&self.db)
        .await?;
        Ok(student.clone())
    }

    async fn find_enrollment_by_id(&self, id: &str) -> Result<Option<Enrollment>, StoreError> {
        sqlx::query_as::<_, EnrollmentRow>(
            "SELECT id, student_id, class_id, day, start_time, end_time, room, created_at FROM enrollments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .map(decode_enrollment)
        .transpose()
    }

    async fn find_enrollments_by_student(&self, student_id: &str) -> Result<Vec<Enrollment>, StoreError> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT id, student_id, class_id, day, start_time, end_time, room, created_at
            FROM enrollments
            WHERE student_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;
        decode_enrollments(rows)
    }

    async fn find_enrollments_by_class(&self, class_id: &str) -> Result<Vec<Enrollment>, StoreError> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT id, student_id, class_id, day, start_time, end_time, room, created_at
            FROM enrollments
            WHERE class_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(class_id)
        .fetch_all(&self.db)
        .await?;
        decode_enrollments(rows)
    }

    async fn find_enrollments_by_student_and_class(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Vec<Enrollment>, StoreError> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT id, student_id, class_id, day, start_time, end_time, room, created_at
            FROM enrollments
            WHERE student_id = ? AND class_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(student_id)
        .bind(class_id)
        .fetch_all(&self.db)
        .await?;
        decode_enrollments(rows)
    }

    async fn exists_exact_enrollment(
        &self,
        student_id: &str,
        class_id: &str,
        slot: &TimeSlot,
    ) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM enrollments
            WHERE student_id = ?1 AND class_id = ?2 AND day = ?3 AND start_time = ?4 AND end_time = ?5
            "#,
        )
        .bind(student_id)
        .bind(class_id)
        .bind(slot.day.as_str())
        .bind(slot.start.to_string())
        .bind(slot.end.to_string())
        .fetch_one(&self.db)
        .await?;
        Ok(count > 0)
    }

    async fn save_enrollment(&self, enrollment: &Enrollment) -> Result<Enrollment, StoreError> {
        let slot = &enrollment.interval.slot;
        sqlx::query(
            r#"
            INSERT INTO enrollments
                (id, student_id, class_id, day, start_time, end_time, room, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&enrollment.id)
        .bind(&enrollment.student_id)
        .bind(&enrollment.class_id)
        .bind(slot.day.as_str())
        .bind(slot.start.to_string())
        .bind(slot.end.to_string())
        .bind(enrollment.interval.room.as_str())
        .bind(&enrollment.created_at)
        .execute(&self.db)
        .await?;
        Ok(enrollment.clone())
    }

    async fn delete_enrollment(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(result > 0)
    }
}
