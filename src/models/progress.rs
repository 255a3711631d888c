use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Progress {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub section_id: Uuid,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SectionProgress {
    pub section_id: Uuid,
    pub section_title: String,
    pub position: i32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct ProgressCounts {
    pub completed: i64,
    pub total: i64,
}

impl ProgressCounts {
    /// Percentage in [0, 100]; an enrollment without sections is at 0.
    pub fn percent_complete(&self) -> f64 {
        if self.total <= 0 {
            return 0.0;
        }
        let done = self.completed.clamp(0, self.total);
        (done as f64 / self.total as f64) * 100.0
    }

    pub fn is_all_complete(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }
}
