use crate::models::enrollment::EnrollmentStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollResponse {
    pub enrollment_id: Uuid,
    pub reactivated: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsEnrolledResponse {
    pub is_enrolled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkSectionCompleteResponse {
    pub percent_complete: f64,
    pub status: EnrollmentStatus,
    pub course_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledCourse {
    pub enrollment_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub status: EnrollmentStatus,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
    pub percent_complete: f64,
}
