use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "attempt_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Graded,
}

impl AttemptStatus {
    pub const ALL: [AttemptStatus; 3] = [
        AttemptStatus::InProgress,
        AttemptStatus::Submitted,
        AttemptStatus::Graded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Submitted => "submitted",
            AttemptStatus::Graded => "graded",
        }
    }

    /// Submitted and graded attempts use up one of the exam's allowed tries.
    pub fn counts_toward_limit(self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }

    pub fn ensure_in_progress(self) -> Result<()> {
        match self {
            AttemptStatus::InProgress => Ok(()),
            other => Err(Error::InvalidState(format!(
                "Attempt is {}, expected in_progress",
                other.as_str()
            ))),
        }
    }

    /// Grading and feedback only apply once answers are frozen.
    pub fn ensure_submitted(self) -> Result<()> {
        match self {
            AttemptStatus::Submitted | AttemptStatus::Graded => Ok(()),
            AttemptStatus::InProgress => Err(Error::InvalidState(
                "Attempt has not been submitted yet".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamAttempt {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub user_id: Uuid,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Percentage with two decimals, null until the first grading pass.
    pub score: Option<Decimal>,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttemptHistoryItem {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub exam_title: String,
    pub course_id: Uuid,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub score: Option<Decimal>,
    pub passing_score: i32,
}
