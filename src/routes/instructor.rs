use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::dto::exam_dto::{
    FeedbackRequest, ManualGradeRequest, ManualGradeResponse, SubmitAttemptResponse,
};
use crate::error::{Error, Result};
use crate::routes::exam::submit_response;
use crate::AppState;

#[axum::debug_handler]
pub async fn exam_attempts(
    State(state): State<AppState>,
    Path(exam_id): Path<Uuid>,
) -> Result<Response> {
    let attempts = state.attempt_service.list_exam_attempts(exam_id).await?;
    Ok(Json(attempts).into_response())
}

#[axum::debug_handler]
pub async fn grade_answer(
    State(state): State<AppState>,
    Path(answer_id): Path<Uuid>,
    Json(payload): Json<ManualGradeRequest>,
) -> Result<Json<ManualGradeResponse>> {
    payload.validate()?;
    let points = Decimal::from_f64(payload.points_earned)
        .ok_or_else(|| Error::BadRequest("Invalid points value".to_string()))?;

    let graded = state
        .attempt_service
        .apply_manual_grade(answer_id, points, payload.is_correct, payload.feedback)
        .await?;

    Ok(Json(ManualGradeResponse {
        attempt_id: graded.attempt.id,
        new_score: graded.report.score.to_f64().unwrap_or(0.0),
        passed: graded.passed,
        fully_graded: graded.report.fully_graded,
    }))
}

#[axum::debug_handler]
pub async fn regrade(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<SubmitAttemptResponse>> {
    let graded = state.attempt_service.regrade(attempt_id).await?;
    Ok(Json(submit_response(&graded)))
}

#[axum::debug_handler]
pub async fn record_feedback(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Response> {
    payload.validate()?;
    let attempt = state
        .attempt_service
        .record_feedback(attempt_id, payload.feedback)
        .await?;
    Ok(Json(attempt).into_response())
}
