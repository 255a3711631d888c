pub mod enrollment;
pub mod exam;
pub mod health;
pub mod instructor;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth, cors, rate_limit};
use crate::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn router(state: AppState, rps: u32) -> Router {
    let learner_api = Router::new()
        .route("/api/courses/:course_id/enroll", post(enrollment::enroll))
        .route("/api/courses/:course_id/enrollment", get(enrollment::is_enrolled))
        .route("/api/courses/:course_id/unenroll", post(enrollment::unenroll))
        .route("/api/courses/:course_id/outline", get(enrollment::course_outline))
        .route("/api/enrollments", get(enrollment::list_enrollments))
        .route(
            "/api/enrollments/:enrollment_id/progress",
            get(enrollment::enrollment_progress),
        )
        .route(
            "/api/enrollments/:enrollment_id/sections/:section_id/complete",
            post(enrollment::mark_section_complete),
        )
        .route("/api/exams/upcoming", get(exam::upcoming_exams))
        .route("/api/exams/history", get(exam::history))
        .route("/api/exams/:exam_id/attempts", post(exam::start_attempt))
        .route("/api/attempts/:attempt_id", get(exam::attempt_result))
        .route("/api/attempts/:attempt_id/answers", put(exam::submit_answer))
        .route("/api/attempts/:attempt_id/submit", post(exam::submit))
        .layer(from_fn(auth::require_bearer_auth));

    let instructor_api = Router::new()
        .route(
            "/api/instructor/exams/:exam_id/attempts",
            get(instructor::exam_attempts),
        )
        .route(
            "/api/instructor/answers/:answer_id/grade",
            post(instructor::grade_answer),
        )
        .route(
            "/api/instructor/attempts/:attempt_id/regrade",
            post(instructor::regrade),
        )
        .route(
            "/api/instructor/attempts/:attempt_id/feedback",
            post(instructor::record_feedback),
        )
        .layer(from_fn(auth::require_instructor));

    Router::new()
        .route("/health", get(health::health))
        .merge(learner_api)
        .merge(instructor_api)
        .layer(from_fn_with_state(
            rate_limit::RateLimiter::new(rps),
            rate_limit::rps_middleware,
        ))
        .with_state(state)
        .layer(cors::api_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
