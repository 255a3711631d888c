use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::exam_dto::{
    AttemptHistoryEntry, StartAttemptResponse, SubmitAnswerRequest, SubmitAttemptResponse,
    UpcomingExam,
};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::answer::AnswerPayload;
use crate::models::exam_attempt::ExamAttempt;
use crate::services::attempt_service::GradedAttempt;
use crate::services::grading_service::GradingService;
use crate::AppState;

async fn owned_attempt(state: &AppState, claims: &Claims, attempt_id: Uuid) -> Result<ExamAttempt> {
    let attempt = state.attempt_service.get_attempt(attempt_id).await?;
    if attempt.user_id != claims.user_id()? {
        return Err(Error::NotFound(format!("Attempt {} not found", attempt_id)));
    }
    Ok(attempt)
}

pub(crate) fn submit_response(graded: &GradedAttempt) -> SubmitAttemptResponse {
    SubmitAttemptResponse {
        attempt_id: graded.attempt.id,
        status: graded.attempt.status.as_str().to_string(),
        score: graded.report.score.to_f64().unwrap_or(0.0),
        passed: graded.passed,
        fully_graded: graded.report.fully_graded,
    }
}

#[axum::debug_handler]
pub async fn upcoming_exams(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UpcomingExam>>> {
    let user_id = claims.user_id()?;
    let now = Utc::now();
    let exams = state.attempt_service.upcoming_exams(user_id, now).await?;

    Ok(Json(
        exams
            .into_iter()
            .map(|exam| UpcomingExam {
                window: exam.window_at(now),
                exam_id: exam.id,
                course_id: exam.course_id,
                title: exam.title,
                exam_type: exam.exam_type,
                start_date: exam.start_date,
                end_date: exam.end_date,
                duration_minutes: exam.duration_minutes,
            })
            .collect(),
    ))
}

#[axum::debug_handler]
pub async fn history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<AttemptHistoryEntry>>> {
    let user_id = claims.user_id()?;
    let rows = state.attempt_service.history(user_id).await?;

    Ok(Json(
        rows.into_iter()
            .map(|row| AttemptHistoryEntry {
                passed: GradingService::is_passed(row.score, row.passing_score),
                attempt_id: row.id,
                exam_id: row.exam_id,
                exam_title: row.exam_title,
                status: row.status.as_str().to_string(),
                started_at: row.start_time,
                ended_at: row.end_time,
                score: row.score.and_then(|s| s.to_f64()),
            })
            .collect(),
    ))
}

#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
) -> Result<Response> {
    let user_id = claims.user_id()?;
    let result = state.attempt_service.start_attempt(exam_id, user_id).await?;
    let exam = state.attempt_service.get_exam(exam_id).await?;

    let status = if result.resumed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let body = StartAttemptResponse {
        attempt_id: result.attempt.id,
        started_at: result.attempt.start_time,
        deadline: exam.attempt_deadline(result.attempt.start_time),
        resumed: result.resumed,
    };
    Ok((status, Json(body)).into_response())
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Response> {
    req.validate()?;
    owned_attempt(&state, &claims, attempt_id).await?;

    let payload = AnswerPayload {
        selected_choice_id: req.selected_choice_id,
        text_answer: req.text_answer,
    };
    state
        .attempt_service
        .submit_answer(attempt_id, req.question_id, payload)
        .await?;
    Ok(Json(json!({})).into_response())
}

#[axum::debug_handler]
pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<SubmitAttemptResponse>> {
    owned_attempt(&state, &claims, attempt_id).await?;
    let graded = state.attempt_service.submit(attempt_id).await?;
    Ok(Json(submit_response(&graded)))
}

#[axum::debug_handler]
pub async fn attempt_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Response> {
    let attempt = owned_attempt(&state, &claims, attempt_id).await?;
    let result = state.attempt_service.attempt_result(attempt).await?;
    Ok(Json(result).into_response())
}
