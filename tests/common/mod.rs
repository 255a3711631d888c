#![allow(dead_code)]

use std::env;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use learning_backend::middleware::auth::Claims;
use learning_backend::models::exam::ExamType;
use learning_backend::models::question::QuestionType;
use sqlx::PgPool;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret_key";

/// Connects and migrates, or returns None when no database is configured so
/// the caller can skip.
pub async fn setup_pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let Ok(url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let pool = learning_backend::database::pool::connect(&url, 10)
        .await
        .expect("pool");
    learning_backend::database::pool::run_migrations(&pool)
        .await
        .expect("migrations");
    Some(pool)
}

pub fn init_test_config() {
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", JWT_SECRET);
    env::set_var("API_RPS", "1000");
    if env::var("DATABASE_URL").is_err() {
        env::set_var("DATABASE_URL", "postgres://localhost/unused");
    }
    let _ = learning_backend::config::init_config();
}

pub fn bearer(user_id: Uuid, role: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        role: Some(role.to_string()),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode token");
    format!("Bearer {}", token)
}

pub async fn seed_user(pool: &PgPool, name: &str) -> Uuid {
    sqlx::query_scalar(r#"INSERT INTO users (username) VALUES ($1) RETURNING id"#)
        .bind(format!("{}_{}", name, Uuid::new_v4().simple()))
        .fetch_one(pool)
        .await
        .expect("seed user")
}

/// Course with `sections` sections, returned in position order.
pub async fn seed_course(pool: &PgPool, title: &str, sections: usize) -> (Uuid, Vec<Uuid>) {
    let course_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO courses (title, is_published) VALUES ($1, TRUE) RETURNING id"#,
    )
    .bind(title)
    .fetch_one(pool)
    .await
    .expect("seed course");

    let mut section_ids = Vec::with_capacity(sections);
    for position in 0..sections {
        section_ids.push(add_section(pool, course_id, position as i32).await);
    }
    (course_id, section_ids)
}

pub async fn add_section(pool: &PgPool, course_id: Uuid, position: i32) -> Uuid {
    sqlx::query_scalar(
        r#"INSERT INTO sections (course_id, title, position) VALUES ($1, $2, $3) RETURNING id"#,
    )
    .bind(course_id)
    .bind(format!("Module {}", position + 1))
    .bind(position)
    .fetch_one(pool)
    .await
    .expect("seed section")
}

pub struct ExamSeed {
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub passing_score: i32,
    pub max_attempts: i32,
}

impl Default for ExamSeed {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            is_active: true,
            start_date: now - Duration::hours(1),
            end_date: now + Duration::hours(1),
            duration_minutes: 60,
            passing_score: 60,
            max_attempts: 2,
        }
    }
}

pub async fn seed_exam(pool: &PgPool, course_id: Uuid, seed: ExamSeed) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO exams (course_id, title, exam_type, start_date, end_date,
                           duration_minutes, passing_score, max_attempts, is_active)
        VALUES ($1, 'Unit exam', $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(course_id)
    .bind(ExamType::Quiz)
    .bind(seed.start_date)
    .bind(seed.end_date)
    .bind(seed.duration_minutes)
    .bind(seed.passing_score)
    .bind(seed.max_attempts)
    .bind(seed.is_active)
    .fetch_one(pool)
    .await
    .expect("seed exam")
}

pub async fn add_question(
    pool: &PgPool,
    exam_id: Uuid,
    question_type: QuestionType,
    points: i32,
    position: i32,
) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO questions (exam_id, question_text, question_type, points, position)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(exam_id)
    .bind(format!("Question {}", position + 1))
    .bind(question_type)
    .bind(points)
    .bind(position)
    .fetch_one(pool)
    .await
    .expect("seed question")
}

pub async fn add_choice(pool: &PgPool, question_id: Uuid, text: &str, is_correct: bool) -> Uuid {
    sqlx::query_scalar(
        r#"INSERT INTO choices (question_id, choice_text, is_correct) VALUES ($1, $2, $3) RETURNING id"#,
    )
    .bind(question_id)
    .bind(text)
    .bind(is_correct)
    .fetch_one(pool)
    .await
    .expect("seed choice")
}

/// Multiple-choice question with one correct and one wrong choice.
pub async fn add_mc_question(pool: &PgPool, exam_id: Uuid, points: i32, position: i32) -> McQuestion {
    let id = add_question(pool, exam_id, QuestionType::MultipleChoice, points, position).await;
    let right = add_choice(pool, id, "right", true).await;
    let wrong = add_choice(pool, id, "wrong", false).await;
    McQuestion { id, right, wrong }
}

pub struct McQuestion {
    pub id: Uuid,
    pub right: Uuid,
    pub wrong: Uuid,
}
