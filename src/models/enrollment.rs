use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "enrollment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
}

/// What an enroll request does to an existing (user, course) row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollDecision {
    Reactivate,
    AlreadyEnrolled,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Dropped => "dropped",
        }
    }

    pub fn on_enroll(self) -> EnrollDecision {
        match self {
            EnrollmentStatus::Dropped => EnrollDecision::Reactivate,
            EnrollmentStatus::Active | EnrollmentStatus::Completed => {
                EnrollDecision::AlreadyEnrolled
            }
        }
    }

    /// Completed is terminal; active and dropped may move to dropped.
    pub fn can_drop(self) -> bool {
        !matches!(self, EnrollmentStatus::Completed)
    }

    pub fn can_complete(self) -> bool {
        matches!(self, EnrollmentStatus::Active)
    }

    /// Enrollments that still grant access to the course's exams.
    pub fn grants_exam_access(self) -> bool {
        !matches!(self, EnrollmentStatus::Dropped)
    }
}

/// `user_name` and `course_name` are copied when the row is created and
/// are never refreshed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub user_name: String,
    pub course_name: String,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnrollmentSummary {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course_name: String,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
    pub completed_sections: i64,
    pub total_sections: i64,
}
