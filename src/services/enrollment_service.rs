use crate::error::{Error, Result};
use crate::models::enrollment::{EnrollDecision, Enrollment, EnrollmentStatus, EnrollmentSummary};
use crate::services::{course_service, progress_service};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollOutcome {
    Created,
    Reactivated,
}

#[derive(Debug, Clone)]
pub struct EnrollResult {
    pub enrollment: Enrollment,
    pub outcome: EnrollOutcome,
}

#[derive(Clone)]
pub struct EnrollmentService {
    pool: PgPool,
}

impl EnrollmentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the enrollment and seeds one progress row per section that
    /// exists right now, or reactivates a dropped one as-is.
    pub async fn enroll(&self, user_id: Uuid, course_id: Uuid) -> Result<EnrollResult> {
        let mut tx = self.pool.begin().await?;

        let course = course_service::find_course(&mut *tx, course_id).await?;

        let existing = sqlx::query_as::<_, Enrollment>(
            r#"SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2 FOR UPDATE"#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(enrollment) = existing {
            return match enrollment.status.on_enroll() {
                EnrollDecision::AlreadyEnrolled => Err(Error::AlreadyEnrolled(format!(
                    "Enrollment {} in course '{}' is already {}",
                    enrollment.id,
                    enrollment.course_name,
                    enrollment.status.as_str()
                ))),
                EnrollDecision::Reactivate => {
                    let reactivated = sqlx::query_as::<_, Enrollment>(
                        r#"
                        UPDATE enrollments
                        SET status = 'active', updated_at = NOW()
                        WHERE id = $1
                        RETURNING *
                        "#,
                    )
                    .bind(enrollment.id)
                    .fetch_one(&mut *tx)
                    .await?;

                    // Sections may have been finished while dropped.
                    let counts =
                        progress_service::count_progress(&mut *tx, reactivated.id).await?;
                    let reactivated =
                        if counts.is_all_complete() && reactivated.status.can_complete() {
                            complete_enrollment(&mut tx, reactivated.id).await?;
                            lock_enrollment(&mut tx, reactivated.id).await?
                        } else {
                            reactivated
                        };
                    tx.commit().await?;

                    tracing::info!(
                        enrollment_id = %reactivated.id,
                        user_id = %user_id,
                        course_id = %course_id,
                        status = reactivated.status.as_str(),
                        "Enrollment reactivated"
                    );
                    Ok(EnrollResult {
                        enrollment: reactivated,
                        outcome: EnrollOutcome::Reactivated,
                    })
                }
            };
        }

        let user = course_service::find_user(&mut *tx, user_id).await?;

        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (user_id, course_id, user_name, course_name, status)
            VALUES ($1, $2, $3, $4, 'active')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(&user.username)
        .bind(&course.title)
        .fetch_one(&mut *tx)
        .await?;

        let sections = course_service::sections_of(&mut *tx, course_id).await?;
        sqlx::query(
            r#"
            INSERT INTO progress (enrollment_id, section_id)
            SELECT $1, UNNEST($2::uuid[])
            "#,
        )
        .bind(enrollment.id)
        .bind(sections.as_slice())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            enrollment_id = %enrollment.id,
            user_id = %user_id,
            course_id = %course_id,
            sections = sections.len(),
            "Enrollment created"
        );
        Ok(EnrollResult {
            enrollment,
            outcome: EnrollOutcome::Created,
        })
    }

    /// Drops the enrollment; progress rows stay for a later reactivation.
    pub async fn unenroll(&self, user_id: Uuid, course_id: Uuid) -> Result<Enrollment> {
        let mut tx = self.pool.begin().await?;

        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2 FOR UPDATE"#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            Error::NotEnrolled(format!("User {} is not enrolled in course {}", user_id, course_id))
        })?;

        if !enrollment.status.can_drop() {
            return Err(Error::InvalidState(format!(
                "Enrollment {} is completed and can no longer be dropped",
                enrollment.id
            )));
        }
        if enrollment.status == EnrollmentStatus::Dropped {
            return Ok(enrollment);
        }

        let dropped = sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE enrollments
            SET status = 'dropped', updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(enrollment.id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(enrollment_id = %dropped.id, user_id = %user_id, "Enrollment dropped");
        Ok(dropped)
    }

    pub async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> Result<bool> {
        let enrolled: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM enrollments
                WHERE user_id = $1 AND course_id = $2 AND status = 'active'
            )
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(enrolled)
    }

    pub async fn get_enrollment(&self, enrollment_id: Uuid) -> Result<Enrollment> {
        sqlx::query_as::<_, Enrollment>(r#"SELECT * FROM enrollments WHERE id = $1"#)
            .bind(enrollment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Enrollment {} not found", enrollment_id)))
    }

    pub async fn find_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Enrollment>> {
        let row = sqlx::query_as::<_, Enrollment>(
            r#"SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2"#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn complete_enrollment(&self, enrollment_id: Uuid) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        complete_enrollment(&mut conn, enrollment_id).await
    }

    pub async fn list_active(&self, user_id: Uuid) -> Result<Vec<EnrollmentSummary>> {
        let rows = sqlx::query_as::<_, EnrollmentSummary>(
            r#"
            SELECT e.id, e.course_id, e.course_name, e.status, e.created_at, e.completion_date,
                   COUNT(p.id) FILTER (WHERE p.completed) AS completed_sections,
                   COUNT(p.id) AS total_sections
            FROM enrollments e
            LEFT JOIN progress p ON p.enrollment_id = e.id
            WHERE e.user_id = $1 AND e.status = 'active'
            GROUP BY e.id
            ORDER BY e.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Moves an active enrollment to completed and stamps the completion date.
/// Any other status is left alone, so a second call never moves the
/// timestamp. Returns whether this call did the transition.
pub async fn complete_enrollment(conn: &mut PgConnection, enrollment_id: Uuid) -> Result<bool> {
    let completed: Option<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE enrollments
        SET status = 'completed', completion_date = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'active'
        RETURNING id
        "#,
    )
    .bind(enrollment_id)
    .fetch_optional(&mut *conn)
    .await?;

    if completed.is_some() {
        tracing::info!(enrollment_id = %enrollment_id, "Enrollment completed");
    }
    Ok(completed.is_some())
}

/// Row lock that serializes every progress transition of one enrollment.
pub async fn lock_enrollment(conn: &mut PgConnection, enrollment_id: Uuid) -> Result<Enrollment> {
    sqlx::query_as::<_, Enrollment>(r#"SELECT * FROM enrollments WHERE id = $1 FOR UPDATE"#)
        .bind(enrollment_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Enrollment {} not found", enrollment_id)))
}
