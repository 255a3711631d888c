use crate::models::exam::{ExamType, ExamWindow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAttemptResponse {
    pub attempt_id: Uuid,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub deadline: chrono::DateTime<chrono::Utc>,
    pub resumed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub question_id: Uuid,
    pub selected_choice_id: Option<Uuid>,
    #[validate(length(max = 20000, message = "Answer text is too long"))]
    pub text_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAttemptResponse {
    pub attempt_id: Uuid,
    pub status: String,
    pub score: f64,
    pub passed: bool,
    pub fully_graded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ManualGradeRequest {
    #[validate(range(min = 0.0, message = "Points cannot be negative"))]
    pub points_earned: f64,
    pub is_correct: bool,
    #[validate(length(max = 5000))]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualGradeResponse {
    pub attempt_id: Uuid,
    pub new_score: f64,
    pub passed: bool,
    pub fully_graded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(length(min = 1, max = 5000, message = "Feedback cannot be empty"))]
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingExam {
    pub exam_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub exam_type: ExamType,
    pub start_date: chrono::DateTime<chrono::Utc>,
    pub end_date: chrono::DateTime<chrono::Utc>,
    pub duration_minutes: i32,
    pub window: ExamWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptHistoryEntry {
    pub attempt_id: Uuid,
    pub exam_id: Uuid,
    pub exam_title: String,
    pub status: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    pub score: Option<f64>,
    pub passed: bool,
}
