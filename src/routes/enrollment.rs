use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use uuid::Uuid;

use crate::dto::enrollment_dto::{
    EnrollResponse, EnrolledCourse, IsEnrolledResponse, MarkSectionCompleteResponse,
};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::enrollment::Enrollment;
use crate::models::progress::ProgressCounts;
use crate::services::enrollment_service::EnrollOutcome;
use crate::AppState;

async fn owned_enrollment(state: &AppState, claims: &Claims, enrollment_id: Uuid) -> Result<Enrollment> {
    let enrollment = state.enrollment_service.get_enrollment(enrollment_id).await?;
    if enrollment.user_id != claims.user_id()? {
        return Err(Error::NotFound(format!("Enrollment {} not found", enrollment_id)));
    }
    Ok(enrollment)
}

#[axum::debug_handler]
pub async fn enroll(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
) -> Result<Response> {
    let user_id = claims.user_id()?;
    let result = state.enrollment_service.enroll(user_id, course_id).await?;

    let (status, message) = match result.outcome {
        EnrollOutcome::Created => (StatusCode::CREATED, "Successfully enrolled in course"),
        EnrollOutcome::Reactivated => (StatusCode::OK, "Successfully re-enrolled in course"),
    };
    let body = EnrollResponse {
        enrollment_id: result.enrollment.id,
        reactivated: result.outcome == EnrollOutcome::Reactivated,
        message: message.to_string(),
    };
    Ok((status, Json(body)).into_response())
}

#[axum::debug_handler]
pub async fn is_enrolled(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<IsEnrolledResponse>> {
    let user_id = claims.user_id()?;
    let is_enrolled = state.enrollment_service.is_enrolled(user_id, course_id).await?;
    Ok(Json(IsEnrolledResponse { is_enrolled }))
}

#[axum::debug_handler]
pub async fn unenroll(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
) -> Result<Response> {
    let user_id = claims.user_id()?;
    state.enrollment_service.unenroll(user_id, course_id).await?;
    Ok(Json(json!({})).into_response())
}

#[axum::debug_handler]
pub async fn course_outline(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Response> {
    let outline = state.course_service.outline(course_id).await?;
    Ok(Json(outline).into_response())
}

#[axum::debug_handler]
pub async fn list_enrollments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<EnrolledCourse>>> {
    let user_id = claims.user_id()?;
    let rows = state.enrollment_service.list_active(user_id).await?;

    let courses = rows
        .into_iter()
        .map(|row| EnrolledCourse {
            enrollment_id: row.id,
            course_id: row.course_id,
            title: row.course_name,
            status: row.status,
            enrolled_at: row.created_at,
            percent_complete: ProgressCounts {
                completed: row.completed_sections,
                total: row.total_sections,
            }
            .percent_complete(),
        })
        .collect();
    Ok(Json(courses))
}

#[axum::debug_handler]
pub async fn enrollment_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(enrollment_id): Path<Uuid>,
) -> Result<Response> {
    let enrollment = owned_enrollment(&state, &claims, enrollment_id).await?;
    let progress = state.progress_service.enrollment_progress(enrollment).await?;
    Ok(Json(progress).into_response())
}

#[axum::debug_handler]
pub async fn mark_section_complete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((enrollment_id, section_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MarkSectionCompleteResponse>> {
    owned_enrollment(&state, &claims, enrollment_id).await?;
    let outcome = state
        .progress_service
        .mark_section_complete(enrollment_id, section_id)
        .await?;

    Ok(Json(MarkSectionCompleteResponse {
        percent_complete: outcome.percent_complete,
        status: outcome.enrollment_status,
        course_completed: outcome.course_completed,
    }))
}
