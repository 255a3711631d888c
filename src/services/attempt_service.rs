use crate::error::{Error, Result};
use crate::models::answer::{Answer, AnswerPayload};
use crate::models::exam::Exam;
use crate::models::exam_attempt::{AttemptHistoryItem, AttemptStatus, ExamAttempt};
use crate::models::enrollment::EnrollmentStatus;
use crate::models::question::{Choice, Question, QuestionWithChoices};
use crate::services::grading_service::{GradeReport, GradingService};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StartAttemptResult {
    pub attempt: ExamAttempt,
    /// The user already had this attempt open; nothing was created.
    pub resumed: bool,
}

#[derive(Debug, Clone)]
pub struct GradedAttempt {
    pub attempt: ExamAttempt,
    pub report: GradeReport,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptResult {
    pub attempt: ExamAttempt,
    pub exam_title: String,
    pub passing_score: i32,
    pub passed: bool,
    pub fully_graded: bool,
    pub answers: Vec<Answer>,
}

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_exam(&self, exam_id: Uuid) -> Result<Exam> {
        find_exam(&self.pool, exam_id).await
    }

    pub async fn start_attempt(&self, exam_id: Uuid, user_id: Uuid) -> Result<StartAttemptResult> {
        let mut tx = self.pool.begin().await?;

        let exam = find_exam(&mut *tx, exam_id).await?;
        exam.check_startable(Utc::now())?;

        let enrollment_status: Option<EnrollmentStatus> = sqlx::query_scalar(
            r#"SELECT status FROM enrollments WHERE user_id = $1 AND course_id = $2"#,
        )
        .bind(user_id)
        .bind(exam.course_id)
        .fetch_optional(&mut *tx)
        .await?;
        if !enrollment_status.is_some_and(|s| s.grants_exam_access()) {
            return Err(Error::NotEnrolled(format!(
                "User {} is not enrolled in the course of exam '{}'",
                user_id, exam.title
            )));
        }

        // Serializes count-then-insert for this (exam, user) pair only.
        sqlx::query(r#"SELECT pg_advisory_xact_lock(hashtextextended($1, 0))"#)
            .bind(format!("exam_attempt:{}:{}", exam_id, user_id))
            .execute(&mut *tx)
            .await?;

        let counted: Vec<&str> = AttemptStatus::ALL
            .into_iter()
            .filter(|s| s.counts_toward_limit())
            .map(|s| s.as_str())
            .collect();
        let used: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM exam_attempts
            WHERE exam_id = $1 AND user_id = $2 AND status::text = ANY($3)
            "#,
        )
        .bind(exam_id)
        .bind(user_id)
        .bind(counted.as_slice())
        .fetch_one(&mut *tx)
        .await?;

        if used >= i64::from(exam.max_attempts) {
            return Err(Error::AttemptLimitExceeded(format!(
                "Exam '{}' allows {} attempt(s), {} already used",
                exam.title, exam.max_attempts, used
            )));
        }

        let open = sqlx::query_as::<_, ExamAttempt>(
            r#"
            SELECT * FROM exam_attempts
            WHERE exam_id = $1 AND user_id = $2 AND status = 'in_progress'
            ORDER BY start_time DESC
            LIMIT 1
            "#,
        )
        .bind(exam_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(attempt) = open {
            tx.commit().await?;
            tracing::info!(attempt_id = %attempt.id, exam_id = %exam_id, user_id = %user_id, "Attempt resumed");
            return Ok(StartAttemptResult {
                attempt,
                resumed: true,
            });
        }

        let attempt = sqlx::query_as::<_, ExamAttempt>(
            r#"
            INSERT INTO exam_attempts (exam_id, user_id, status, start_time)
            VALUES ($1, $2, 'in_progress', NOW())
            RETURNING *
            "#,
        )
        .bind(exam_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            attempt_id = %attempt.id,
            exam_id = %exam_id,
            user_id = %user_id,
            attempt_number = used + 1,
            "Attempt started"
        );
        Ok(StartAttemptResult {
            attempt,
            resumed: false,
        })
    }

    /// Saves or replaces the answer to one question. Grading waits for submit.
    pub async fn submit_answer(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        payload: AnswerPayload,
    ) -> Result<Answer> {
        let mut tx = self.pool.begin().await?;

        let attempt = lock_attempt(&mut tx, attempt_id).await?;
        attempt.status.ensure_in_progress()?;

        let exam = find_exam(&mut *tx, attempt.exam_id).await?;
        let deadline = exam.attempt_deadline(attempt.start_time);
        if Utc::now() > deadline {
            return Err(Error::ExamClosed(format!(
                "Time for this attempt ran out at {}",
                deadline.to_rfc3339()
            )));
        }

        let question = load_questions(&mut tx, exam.id)
            .await?
            .into_iter()
            .find(|q| q.question.id == question_id)
            .ok_or_else(|| {
                Error::NotFound(format!("Question {} is not part of exam {}", question_id, exam.id))
            })?;
        payload.check_against(&question)?;

        let answer = sqlx::query_as::<_, Answer>(
            r#"
            INSERT INTO answers (attempt_id, question_id, selected_choice_id, text_answer)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (attempt_id, question_id) DO UPDATE
            SET selected_choice_id = EXCLUDED.selected_choice_id,
                text_answer = EXCLUDED.text_answer,
                is_correct = NULL,
                points_earned = NULL,
                answered_at = NOW()
            RETURNING *
            "#,
        )
        .bind(attempt_id)
        .bind(question_id)
        .bind(payload.selected_choice_id)
        .bind(payload.text_answer.unwrap_or_default())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(r#"UPDATE exam_attempts SET updated_at = NOW() WHERE id = $1"#)
            .bind(attempt_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(answer)
    }

    /// Freezes the answers and grades them in the same transaction.
    pub async fn submit(&self, attempt_id: Uuid) -> Result<GradedAttempt> {
        let mut tx = self.pool.begin().await?;

        let attempt = lock_attempt(&mut tx, attempt_id).await?;
        attempt.status.ensure_in_progress()?;

        let submitted = sqlx::query_as::<_, ExamAttempt>(
            r#"
            UPDATE exam_attempts
            SET status = 'submitted', end_time = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(attempt_id)
        .fetch_one(&mut *tx)
        .await?;
        tracing::info!(attempt_id = %attempt_id, "Attempt submitted");

        let graded = grade_locked(&mut tx, submitted).await?;
        tx.commit().await?;

        tracing::info!(
            attempt_id = %attempt_id,
            score = %graded.report.score,
            passed = graded.passed,
            fully_graded = graded.report.fully_graded,
            "Attempt graded"
        );
        Ok(graded)
    }

    /// Re-runs automatic grading on the stored answers of a submitted or
    /// graded attempt. Manual grades on written answers are kept; a manual
    /// override on a multiple-choice or true/false answer is replaced by the
    /// automatic grade.
    pub async fn regrade(&self, attempt_id: Uuid) -> Result<GradedAttempt> {
        let mut tx = self.pool.begin().await?;

        let attempt = lock_attempt(&mut tx, attempt_id).await?;
        attempt.status.ensure_submitted()?;

        let graded = grade_locked(&mut tx, attempt).await?;
        tx.commit().await?;

        tracing::info!(attempt_id = %attempt_id, score = %graded.report.score, "Attempt regraded");
        Ok(graded)
    }

    pub async fn apply_manual_grade(
        &self,
        answer_id: Uuid,
        points_earned: Decimal,
        is_correct: bool,
        feedback: Option<String>,
    ) -> Result<GradedAttempt> {
        let attempt_id: Uuid =
            sqlx::query_scalar(r#"SELECT attempt_id FROM answers WHERE id = $1"#)
                .bind(answer_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Answer {} not found", answer_id)))?;

        let mut tx = self.pool.begin().await?;

        let attempt = lock_attempt(&mut tx, attempt_id).await?;
        attempt.status.ensure_submitted()?;

        let questions = load_questions(&mut tx, attempt.exam_id).await?;
        let answer = sqlx::query_as::<_, Answer>(r#"SELECT * FROM answers WHERE id = $1"#)
            .bind(answer_id)
            .fetch_one(&mut *tx)
            .await?;
        let question = questions
            .iter()
            .find(|q| q.question.id == answer.question_id)
            .ok_or_else(|| {
                Error::NotFound(format!("Question {} not found", answer.question_id))
            })?;

        let max_points = Decimal::from(question.question.points);
        if points_earned < Decimal::ZERO || points_earned > max_points {
            return Err(Error::BadRequest(format!(
                "Points must be between 0 and {} for question {}",
                max_points, question.question.id
            )));
        }

        sqlx::query(
            r#"
            UPDATE answers
            SET points_earned = $2, is_correct = $3, feedback = COALESCE($4, feedback)
            WHERE id = $1
            "#,
        )
        .bind(answer_id)
        .bind(points_earned.round_dp(2))
        .bind(is_correct)
        .bind(feedback)
        .execute(&mut *tx)
        .await?;

        let answers = load_answers(&mut *tx, attempt_id).await?;
        let report = GradingService::tally(&questions, GradingService::stored_grades(&answers));
        let graded = store_score(&mut tx, attempt_id, report).await?;
        tx.commit().await?;

        tracing::info!(
            attempt_id = %attempt_id,
            answer_id = %answer_id,
            points = %points_earned,
            score = %graded.report.score,
            "Manual grade applied"
        );
        Ok(graded)
    }

    pub async fn record_feedback(&self, attempt_id: Uuid, feedback: String) -> Result<ExamAttempt> {
        let mut tx = self.pool.begin().await?;

        let attempt = lock_attempt(&mut tx, attempt_id).await?;
        attempt.status.ensure_submitted()?;

        let updated = sqlx::query_as::<_, ExamAttempt>(
            r#"
            UPDATE exam_attempts
            SET feedback = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(attempt_id)
        .bind(feedback)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(updated)
    }

    pub async fn get_attempt(&self, attempt_id: Uuid) -> Result<ExamAttempt> {
        sqlx::query_as::<_, ExamAttempt>(r#"SELECT * FROM exam_attempts WHERE id = $1"#)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Attempt {} not found", attempt_id)))
    }

    pub async fn attempt_result(&self, attempt: ExamAttempt) -> Result<AttemptResult> {
        let exam = find_exam(&self.pool, attempt.exam_id).await?;
        let answers = load_answers(&self.pool, attempt.id).await?;
        let fully_graded = attempt.status == AttemptStatus::Graded
            && answers.iter().all(|a| a.points_earned.is_some());

        Ok(AttemptResult {
            passed: GradingService::is_passed(attempt.score, exam.passing_score),
            exam_title: exam.title,
            passing_score: exam.passing_score,
            fully_graded,
            answers,
            attempt,
        })
    }

    pub async fn list_exam_attempts(&self, exam_id: Uuid) -> Result<Vec<ExamAttempt>> {
        find_exam(&self.pool, exam_id).await?;
        let rows = sqlx::query_as::<_, ExamAttempt>(
            r#"SELECT * FROM exam_attempts WHERE exam_id = $1 ORDER BY start_time DESC"#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn history(&self, user_id: Uuid) -> Result<Vec<AttemptHistoryItem>> {
        let rows = sqlx::query_as::<_, AttemptHistoryItem>(
            r#"
            SELECT a.id, a.exam_id, e.title AS exam_title, e.course_id, a.status,
                   a.start_time, a.end_time, a.score, e.passing_score
            FROM exam_attempts a
            JOIN exams e ON e.id = a.exam_id
            WHERE a.user_id = $1
            ORDER BY a.start_time DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Active exams that have not closed yet, in courses the user is
    /// actively enrolled in.
    pub async fn upcoming_exams(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Exam>> {
        let rows = sqlx::query_as::<_, Exam>(
            r#"
            SELECT ex.*
            FROM exams ex
            JOIN enrollments en ON en.course_id = ex.course_id
            WHERE en.user_id = $1
              AND en.status = 'active'
              AND ex.is_active
              AND ex.end_date >= $2
            ORDER BY ex.start_date
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

async fn find_exam<'e, E>(executor: E, exam_id: Uuid) -> Result<Exam>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Exam>(r#"SELECT * FROM exams WHERE id = $1"#)
        .bind(exam_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Exam {} not found", exam_id)))
}

async fn lock_attempt(conn: &mut PgConnection, attempt_id: Uuid) -> Result<ExamAttempt> {
    sqlx::query_as::<_, ExamAttempt>(r#"SELECT * FROM exam_attempts WHERE id = $1 FOR UPDATE"#)
        .bind(attempt_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Attempt {} not found", attempt_id)))
}

async fn load_questions(conn: &mut PgConnection, exam_id: Uuid) -> Result<Vec<QuestionWithChoices>> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, exam_id, question_text, question_type, points, position
        FROM questions
        WHERE exam_id = $1
        ORDER BY position
        "#,
    )
    .bind(exam_id)
    .fetch_all(&mut *conn)
    .await?;

    let question_ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
    let choices = sqlx::query_as::<_, Choice>(
        r#"
        SELECT id, question_id, choice_text, is_correct
        FROM choices
        WHERE question_id = ANY($1)
        "#,
    )
    .bind(question_ids.as_slice())
    .fetch_all(&mut *conn)
    .await?;

    Ok(questions
        .into_iter()
        .map(|question| {
            let choices = choices
                .iter()
                .filter(|c| c.question_id == question.id)
                .cloned()
                .collect();
            QuestionWithChoices { question, choices }
        })
        .collect())
}

async fn load_answers<'e, E>(executor: E, attempt_id: Uuid) -> Result<Vec<Answer>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, Answer>(
        r#"SELECT * FROM answers WHERE attempt_id = $1 ORDER BY answered_at"#,
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

/// Caller holds the attempt row lock.
async fn grade_locked(conn: &mut PgConnection, attempt: ExamAttempt) -> Result<GradedAttempt> {
    let questions = load_questions(conn, attempt.exam_id).await?;
    let answers = load_answers(&mut *conn, attempt.id).await?;
    let report = GradingService::grade(&questions, &answers);

    for grade in report.answers.iter().filter(|g| g.auto_graded) {
        sqlx::query(r#"UPDATE answers SET is_correct = $2, points_earned = $3 WHERE id = $1"#)
            .bind(grade.answer_id)
            .bind(grade.is_correct)
            .bind(grade.points_earned)
            .execute(&mut *conn)
            .await?;
    }

    store_score(conn, attempt.id, report).await
}

async fn store_score(
    conn: &mut PgConnection,
    attempt_id: Uuid,
    report: GradeReport,
) -> Result<GradedAttempt> {
    let attempt = sqlx::query_as::<_, ExamAttempt>(
        r#"
        UPDATE exam_attempts
        SET score = $2, status = 'graded', updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(attempt_id)
    .bind(report.score)
    .fetch_one(&mut *conn)
    .await?;

    let passing_score: i32 =
        sqlx::query_scalar(r#"SELECT passing_score FROM exams WHERE id = $1"#)
            .bind(attempt.exam_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(GradedAttempt {
        passed: GradingService::is_passed(attempt.score, passing_score),
        attempt,
        report,
    })
}
