use crate::error::{Error, Result};
use crate::models::enrollment::{Enrollment, EnrollmentStatus};
use crate::models::progress::{Progress, ProgressCounts, SectionProgress};
use crate::services::enrollment_service;
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct MarkCompleteOutcome {
    pub enrollment_id: Uuid,
    pub section_id: Uuid,
    pub percent_complete: f64,
    pub enrollment_status: EnrollmentStatus,
    /// True only for the call that moved the enrollment to completed.
    pub course_completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentProgress {
    pub enrollment: Enrollment,
    pub percent_complete: f64,
    pub sections: Vec<SectionProgress>,
}

#[derive(Clone)]
pub struct ProgressService {
    pool: PgPool,
}

impl ProgressService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Marks one section done and, under the same enrollment lock, completes
    /// the enrollment once every tracked section is done. Re-marking a
    /// finished section keeps its original timestamp.
    pub async fn mark_section_complete(
        &self,
        enrollment_id: Uuid,
        section_id: Uuid,
    ) -> Result<MarkCompleteOutcome> {
        let mut tx = self.pool.begin().await?;

        let enrollment = enrollment_service::lock_enrollment(&mut tx, enrollment_id).await?;

        let progress = sqlx::query_as::<_, Progress>(
            r#"
            UPDATE progress
            SET completed = TRUE,
                completed_at = CASE WHEN completed THEN completed_at ELSE NOW() END,
                updated_at = CASE WHEN completed THEN updated_at ELSE NOW() END
            WHERE enrollment_id = $1 AND section_id = $2
            RETURNING *
            "#,
        )
        .bind(enrollment_id)
        .bind(section_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!(
                "Section {} is not tracked by enrollment {}",
                section_id, enrollment_id
            ))
        })?;

        let counts = count_progress(&mut *tx, enrollment_id).await?;
        let course_completed = if counts.is_all_complete() && enrollment.status.can_complete() {
            enrollment_service::complete_enrollment(&mut tx, enrollment.id).await?
        } else {
            false
        };
        let enrollment_status = if course_completed {
            EnrollmentStatus::Completed
        } else {
            enrollment.status
        };

        tx.commit().await?;

        tracing::info!(
            enrollment_id = %enrollment_id,
            section_id = %progress.section_id,
            completed = counts.completed,
            total = counts.total,
            "Section marked complete"
        );

        Ok(MarkCompleteOutcome {
            enrollment_id,
            section_id,
            percent_complete: counts.percent_complete(),
            enrollment_status,
            course_completed,
        })
    }

    pub async fn percent_complete(&self, enrollment_id: Uuid) -> Result<f64> {
        ensure_enrollment_exists(&self.pool, enrollment_id).await?;
        let counts = count_progress(&self.pool, enrollment_id).await?;
        Ok(counts.percent_complete())
    }

    pub async fn enrollment_progress(&self, enrollment: Enrollment) -> Result<EnrollmentProgress> {
        let sections = sqlx::query_as::<_, SectionProgress>(
            r#"
            SELECT p.section_id, s.title AS section_title, s.position, p.completed, p.completed_at
            FROM progress p
            JOIN sections s ON s.id = p.section_id
            WHERE p.enrollment_id = $1
            ORDER BY s.position, s.created_at
            "#,
        )
        .bind(enrollment.id)
        .fetch_all(&self.pool)
        .await?;

        let counts = ProgressCounts {
            completed: sections.iter().filter(|s| s.completed).count() as i64,
            total: sections.len() as i64,
        };

        Ok(EnrollmentProgress {
            enrollment,
            percent_complete: counts.percent_complete(),
            sections,
        })
    }
}

pub async fn count_progress<'e, E>(executor: E, enrollment_id: Uuid) -> Result<ProgressCounts>
where
    E: PgExecutor<'e>,
{
    let counts = sqlx::query_as::<_, ProgressCounts>(
        r#"
        SELECT COUNT(*) FILTER (WHERE completed) AS completed, COUNT(*) AS total
        FROM progress
        WHERE enrollment_id = $1
        "#,
    )
    .bind(enrollment_id)
    .fetch_one(executor)
    .await?;
    Ok(counts)
}

async fn ensure_enrollment_exists<'e, E>(executor: E, enrollment_id: Uuid) -> Result<()>
where
    E: PgExecutor<'e>,
{
    let exists: bool =
        sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM enrollments WHERE id = $1)"#)
            .bind(enrollment_id)
            .fetch_one(executor)
            .await?;
    if !exists {
        return Err(Error::NotFound(format!("Enrollment {} not found", enrollment_id)));
    }
    Ok(())
}
