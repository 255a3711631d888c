pub mod attempt_service;
pub mod course_service;
pub mod enrollment_service;
pub mod grading_service;
pub mod progress_service;
