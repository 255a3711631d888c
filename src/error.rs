use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already enrolled: {0}")]
    AlreadyEnrolled(String),

    #[error("Not enrolled: {0}")]
    NotEnrolled(String),

    #[error("Exam not active: {0}")]
    ExamNotActive(String),

    #[error("Exam closed: {0}")]
    ExamClosed(String),

    #[error("Attempt limit exceeded: {0}")]
    AttemptLimitExceeded(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Stable machine-readable kind, part of the response contract.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::AlreadyEnrolled(_) => "already_enrolled",
            Error::NotEnrolled(_) => "not_enrolled",
            Error::ExamNotActive(_) => "exam_not_active",
            Error::ExamClosed(_) => "exam_closed",
            Error::AttemptLimitExceeded(_) => "attempt_limit_exceeded",
            Error::InvalidState(_) => "invalid_state",
            Error::ConstraintViolation(_) => "constraint_violation",
            Error::BadRequest(_) | Error::Validation(_) | Error::Json(_) => "bad_request",
            Error::Unauthorized(_) => "unauthorized",
            _ => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::AlreadyEnrolled(_)
            | Error::AttemptLimitExceeded(_)
            | Error::InvalidState(_)
            | Error::ConstraintViolation(_) => StatusCode::CONFLICT,
            Error::NotEnrolled(_) | Error::ExamNotActive(_) | Error::ExamClosed(_) => {
                StatusCode::FORBIDDEN
            }
            Error::BadRequest(_) | Error::Validation(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let message = match &self {
            Error::NotFound(msg)
            | Error::AlreadyEnrolled(msg)
            | Error::NotEnrolled(msg)
            | Error::ExamNotActive(msg)
            | Error::ExamClosed(msg)
            | Error::AttemptLimitExceeded(msg)
            | Error::InvalidState(msg)
            | Error::ConstraintViolation(msg)
            | Error::BadRequest(msg)
            | Error::Unauthorized(msg) => msg.clone(),
            Error::Validation(err) => err.to_string(),
            Error::Json(err) => err.to_string(),
            other => {
                tracing::error!(error = ?other, "Request failed with internal error");
                "An unexpected error occurred".to_string()
            }
        };

        let body = Json(json!({ "error": self.kind(), "message": message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let constraint = db.constraint().unwrap_or("unique index").to_string();
                tracing::warn!(constraint = %constraint, "Concurrent write lost a uniqueness race");
                Error::ConstraintViolation(format!("Concurrent update conflicted on {}", constraint))
            }
            other => Error::Database(other),
        }
    }
}
