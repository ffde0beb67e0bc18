use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::validation::not_blank;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub name: String,
    pub subject: Option<String>,
    pub created_at: String,
}

impl Teacher {
    pub fn new(name: String, subject: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            subject,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

impl Student {
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewTeacherRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewStudentRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(email(code = "invalid_email", message = "must be a valid email address"))]
    pub email: String,
}
