use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "exam_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExamType {
    Quiz,
    Midterm,
    Final,
    Assignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamWindow {
    Upcoming,
    Ongoing,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exam {
    pub id: Uuid,
    pub course_id: Uuid,
    pub section_id: Option<Uuid>,
    pub title: String,
    pub exam_type: ExamType,
    pub description: String,
    pub instructions: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration_minutes: i32,
    /// Percentage an attempt must reach to pass.
    pub passing_score: i32,
    pub max_attempts: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Exam {
    pub fn window_at(&self, now: DateTime<Utc>) -> ExamWindow {
        if now < self.start_date {
            ExamWindow::Upcoming
        } else if now > self.end_date {
            ExamWindow::Closed
        } else {
            ExamWindow::Ongoing
        }
    }

    pub fn check_startable(&self, now: DateTime<Utc>) -> Result<()> {
        if !self.is_active {
            return Err(Error::ExamNotActive(format!(
                "Exam '{}' is not active",
                self.title
            )));
        }
        match self.window_at(now) {
            ExamWindow::Ongoing => Ok(()),
            ExamWindow::Upcoming => Err(Error::ExamClosed(format!(
                "Exam '{}' opens at {}",
                self.title,
                self.start_date.to_rfc3339()
            ))),
            ExamWindow::Closed => Err(Error::ExamClosed(format!(
                "Exam '{}' closed at {}",
                self.title,
                self.end_date.to_rfc3339()
            ))),
        }
    }

    /// An attempt ends at its duration limit or when the exam closes,
    /// whichever comes first.
    pub fn attempt_deadline(&self, start_time: DateTime<Utc>) -> DateTime<Utc> {
        let by_duration = start_time + Duration::minutes(i64::from(self.duration_minutes));
        by_duration.min(self.end_date)
    }
}
