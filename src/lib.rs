pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::services::{
    attempt_service::AttemptService, course_service::CourseService,
    enrollment_service::EnrollmentService, progress_service::ProgressService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub course_service: CourseService,
    pub enrollment_service: EnrollmentService,
    pub progress_service: ProgressService,
    pub attempt_service: AttemptService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            course_service: CourseService::new(pool.clone()),
            enrollment_service: EnrollmentService::new(pool.clone()),
            progress_service: ProgressService::new(pool.clone()),
            attempt_service: AttemptService::new(pool.clone()),
            pool,
        }
    }
}
