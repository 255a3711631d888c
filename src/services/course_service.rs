//! Read-only view over the catalog and account tables. The catalog screens
//! own these rows; nothing here writes to them and nothing is cached.

use crate::error::{Error, Result};
use crate::models::course::{Course, Lesson, Section, SectionOutline};
use crate::models::user::User;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Clone)]
pub struct CourseService {
    pool: PgPool,
}

impl CourseService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn sections_of(&self, course_id: Uuid) -> Result<Vec<Uuid>> {
        sections_of(&self.pool, course_id).await
    }

    pub async fn total_sections(&self, course_id: Uuid) -> Result<i64> {
        let total: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM sections WHERE course_id = $1"#)
                .bind(course_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }

    pub async fn get_course(&self, course_id: Uuid) -> Result<Course> {
        find_course(&self.pool, course_id).await
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        find_user(&self.pool, user_id).await
    }

    pub async fn outline(&self, course_id: Uuid) -> Result<Vec<SectionOutline>> {
        find_course(&self.pool, course_id).await?;

        let sections = sqlx::query_as::<_, Section>(
            r#"
            SELECT id, course_id, title, description, position, created_at
            FROM sections
            WHERE course_id = $1
            ORDER BY position, created_at
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let section_ids: Vec<Uuid> = sections.iter().map(|s| s.id).collect();
        let lessons = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT id, section_id, title, content_type, position
            FROM lessons
            WHERE section_id = ANY($1)
            ORDER BY position
            "#,
        )
        .bind(section_ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let outline = sections
            .into_iter()
            .map(|section| {
                let lessons = lessons
                    .iter()
                    .filter(|l| l.section_id == section.id)
                    .cloned()
                    .collect();
                SectionOutline { section, lessons }
            })
            .collect();
        Ok(outline)
    }
}

/// Section ids of a course in display order.
pub async fn sections_of<'e, E>(executor: E, course_id: Uuid) -> Result<Vec<Uuid>>
where
    E: PgExecutor<'e>,
{
    let ids: Vec<Uuid> = sqlx::query_scalar(
        r#"SELECT id FROM sections WHERE course_id = $1 ORDER BY position, created_at"#,
    )
    .bind(course_id)
    .fetch_all(executor)
    .await?;
    Ok(ids)
}

pub async fn find_course<'e, E>(executor: E, course_id: Uuid) -> Result<Course>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Course>(
        r#"
        SELECT id, title, description, is_published, created_at, updated_at
        FROM courses WHERE id = $1
        "#,
    )
    .bind(course_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Course {} not found", course_id)))
}

pub async fn find_user<'e, E>(executor: E, user_id: Uuid) -> Result<User>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(r#"SELECT id, username, role, created_at FROM users WHERE id = $1"#)
        .bind(user_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))
}
