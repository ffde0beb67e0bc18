use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::schedule::{Schedule, ScheduleFormatError};
use crate::validation::not_blank;

/// A class row as the store hands it out, schedule still in persisted text form.
#[derive(Debug, Clone, FromRow)]
pub struct ClassRecord {
    pub id: String,
    pub title: String,
    pub subject: Option<String>,
    pub teacher_id: Option<String>,
    pub teacher_name: Option<String>,
    pub schedule: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ClassRecord {
    pub fn into_class(self) -> Result<Class, ScheduleFormatError> {
        let schedule = Schedule::parse(&self.schedule)?;
        Ok(Class {
            id: self.id,
            title: self.title,
            subject: self.subject,
            teacher_id: self.teacher_id,
            teacher_name: self.teacher_name,
            schedule,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub title: String,
    pub subject: Option<String>,
    pub teacher_id: Option<String>,
    pub teacher_name: Option<String>,
    pub schedule: Schedule,
    pub created_at: String,
    pub updated_at: String,
}

impl Class {
    pub fn new(title: String, subject: Option<String>, teacher_id: String, schedule: Schedule) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            subject,
            teacher_id: Some(teacher_id),
            teacher_name: None,
            schedule,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn to_record(&self) -> ClassRecord {
        ClassRecord {
            id: self.id.clone(),
            title: self.title.clone(),
            subject: self.subject.clone(),
            teacher_id: self.teacher_id.clone(),
            teacher_name: self.teacher_name.clone(),
            schedule: self.schedule.serialize(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }

    pub fn teacher_display_name(&self) -> &str {
        self.teacher_name.as_deref().unwrap_or("Unknown")
    }
}

/// Body of `POST /classes` and `PUT /classes/{id}`. The schedule is kept as a
/// raw document (object or JSON text) until the service parses it.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClassRequest {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    pub subject: Option<String>,
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub schedule: Value,
}
