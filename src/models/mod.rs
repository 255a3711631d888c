pub mod answer;
pub mod course;
pub mod enrollment;
pub mod exam;
pub mod exam_attempt;
pub mod progress;
pub mod question;
pub mod user;
