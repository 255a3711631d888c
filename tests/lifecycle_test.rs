use std::time::{Duration as StdDuration, Instant};

use axum::http::StatusCode;
use chrono::{Duration, TimeZone, Utc};
use learning_backend::config::{parse_log_format, LogFormat};
use learning_backend::error::Error;
use learning_backend::middleware::rate_limit::RateLimiter;
use learning_backend::models::answer::AnswerPayload;
use learning_backend::models::enrollment::{EnrollDecision, EnrollmentStatus};
use learning_backend::models::exam::{Exam, ExamType, ExamWindow};
use learning_backend::models::exam_attempt::AttemptStatus;
use learning_backend::models::progress::ProgressCounts;
use learning_backend::models::question::{Choice, Question, QuestionType, QuestionWithChoices};
use uuid::Uuid;

fn exam(is_active: bool) -> Exam {
    let start = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
    Exam {
        id: Uuid::new_v4(),
        course_id: Uuid::new_v4(),
        section_id: None,
        title: "Midterm".into(),
        exam_type: ExamType::Midterm,
        description: String::new(),
        instructions: String::new(),
        start_date: start,
        end_date: start + Duration::hours(3),
        duration_minutes: 60,
        passing_score: 60,
        max_attempts: 2,
        is_active,
        created_at: start - Duration::days(7),
    }
}

#[test]
fn enroll_reactivates_only_dropped_enrollments() {
    assert_eq!(EnrollmentStatus::Dropped.on_enroll(), EnrollDecision::Reactivate);
    assert_eq!(EnrollmentStatus::Active.on_enroll(), EnrollDecision::AlreadyEnrolled);
    assert_eq!(EnrollmentStatus::Completed.on_enroll(), EnrollDecision::AlreadyEnrolled);
}

#[test]
fn completed_is_terminal() {
    assert!(EnrollmentStatus::Active.can_complete());
    assert!(!EnrollmentStatus::Completed.can_complete());
    assert!(!EnrollmentStatus::Dropped.can_complete());

    assert!(EnrollmentStatus::Active.can_drop());
    assert!(EnrollmentStatus::Dropped.can_drop());
    assert!(!EnrollmentStatus::Completed.can_drop());
}

#[test]
fn dropped_enrollments_lose_exam_access() {
    assert!(EnrollmentStatus::Active.grants_exam_access());
    assert!(EnrollmentStatus::Completed.grants_exam_access());
    assert!(!EnrollmentStatus::Dropped.grants_exam_access());
}

#[test]
fn attempt_transitions_never_go_back_to_in_progress() {
    assert!(AttemptStatus::InProgress.ensure_in_progress().is_ok());
    for status in [AttemptStatus::Submitted, AttemptStatus::Graded] {
        let err = status.ensure_in_progress().unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
        assert!(status.ensure_submitted().is_ok());
        assert!(status.counts_toward_limit());
    }
    assert!(AttemptStatus::InProgress.ensure_submitted().is_err());
    assert!(!AttemptStatus::InProgress.counts_toward_limit());
}

#[test]
fn exam_window_is_derived_from_the_clock() {
    let e = exam(true);
    assert_eq!(e.window_at(e.start_date - Duration::seconds(1)), ExamWindow::Upcoming);
    assert_eq!(e.window_at(e.start_date), ExamWindow::Ongoing);
    assert_eq!(e.window_at(e.end_date), ExamWindow::Ongoing);
    assert_eq!(e.window_at(e.end_date + Duration::seconds(1)), ExamWindow::Closed);
}

#[test]
fn inactive_exam_is_rejected_before_the_window_check() {
    let e = exam(false);
    let err = e.check_startable(e.start_date + Duration::minutes(5)).unwrap_err();
    assert!(matches!(err, Error::ExamNotActive(_)));
}

#[test]
fn starting_outside_the_window_is_closed() {
    let e = exam(true);
    assert!(e.check_startable(e.start_date + Duration::minutes(5)).is_ok());
    assert!(matches!(
        e.check_startable(e.start_date - Duration::minutes(5)),
        Err(Error::ExamClosed(_))
    ));
    assert!(matches!(
        e.check_startable(e.end_date + Duration::minutes(5)),
        Err(Error::ExamClosed(_))
    ));
}

#[test]
fn attempt_deadline_is_capped_by_exam_end() {
    let e = exam(true);
    let early = e.start_date;
    assert_eq!(e.attempt_deadline(early), early + Duration::minutes(60));

    let late = e.end_date - Duration::minutes(10);
    assert_eq!(e.attempt_deadline(late), e.end_date);
}

#[test]
fn percent_complete_stays_within_bounds() {
    assert_eq!(ProgressCounts { completed: 0, total: 0 }.percent_complete(), 0.0);
    assert_eq!(ProgressCounts { completed: 0, total: 4 }.percent_complete(), 0.0);
    assert_eq!(ProgressCounts { completed: 1, total: 4 }.percent_complete(), 25.0);
    assert_eq!(ProgressCounts { completed: 4, total: 4 }.percent_complete(), 100.0);

    let third = ProgressCounts { completed: 1, total: 3 }.percent_complete();
    assert!((third - 33.333).abs() < 0.01);
}

#[test]
fn all_complete_requires_at_least_one_section() {
    assert!(!ProgressCounts { completed: 0, total: 0 }.is_all_complete());
    assert!(!ProgressCounts { completed: 2, total: 3 }.is_all_complete());
    assert!(ProgressCounts { completed: 3, total: 3 }.is_all_complete());
}

fn question_with(question_type: QuestionType) -> QuestionWithChoices {
    let id = Uuid::new_v4();
    QuestionWithChoices {
        question: Question {
            id,
            exam_id: Uuid::nil(),
            question_text: "?".into(),
            question_type,
            points: 1,
            position: 0,
        },
        choices: vec![Choice {
            id: Uuid::new_v4(),
            question_id: id,
            choice_text: "yes".into(),
            is_correct: true,
        }],
    }
}

#[test]
fn answer_payload_must_match_question_type() {
    let mc = question_with(QuestionType::MultipleChoice);
    let own_choice = AnswerPayload {
        selected_choice_id: Some(mc.choices[0].id),
        text_answer: None,
    };
    assert!(own_choice.check_against(&mc).is_ok());

    let foreign_choice = AnswerPayload {
        selected_choice_id: Some(Uuid::new_v4()),
        text_answer: None,
    };
    assert!(matches!(foreign_choice.check_against(&mc), Err(Error::NotFound(_))));
    assert!(matches!(
        AnswerPayload::default().check_against(&mc),
        Err(Error::BadRequest(_))
    ));

    let essay = question_with(QuestionType::Essay);
    let text = AnswerPayload {
        selected_choice_id: None,
        text_answer: Some("An answer".into()),
    };
    assert!(text.check_against(&essay).is_ok());
    assert!(matches!(own_choice.check_against(&essay), Err(Error::BadRequest(_))));
}

#[test]
fn error_kinds_map_to_stable_statuses() {
    let cases = [
        (Error::NotFound("x".into()), "not_found", StatusCode::NOT_FOUND),
        (Error::AlreadyEnrolled("x".into()), "already_enrolled", StatusCode::CONFLICT),
        (Error::NotEnrolled("x".into()), "not_enrolled", StatusCode::FORBIDDEN),
        (Error::ExamNotActive("x".into()), "exam_not_active", StatusCode::FORBIDDEN),
        (Error::ExamClosed("x".into()), "exam_closed", StatusCode::FORBIDDEN),
        (
            Error::AttemptLimitExceeded("x".into()),
            "attempt_limit_exceeded",
            StatusCode::CONFLICT,
        ),
        (Error::InvalidState("x".into()), "invalid_state", StatusCode::CONFLICT),
        (
            Error::ConstraintViolation("x".into()),
            "constraint_violation",
            StatusCode::CONFLICT,
        ),
        (Error::Config("x".into()), "internal", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, kind, status) in cases {
        assert_eq!(err.kind(), kind);
        assert_eq!(err.status_code(), status);
    }
}

#[test]
fn row_not_found_becomes_not_found() {
    let err: Error = sqlx::Error::RowNotFound.into();
    assert_eq!(err.kind(), "not_found");
}

#[test]
fn rate_limiter_resets_every_second() {
    let limiter = RateLimiter::new(2);
    let t0 = Instant::now();
    assert!(limiter.allow_at(t0));
    assert!(limiter.allow_at(t0));
    assert!(!limiter.allow_at(t0));
    assert!(limiter.allow_at(t0 + StdDuration::from_millis(1001)));
}

#[test]
fn log_format_parsing() {
    assert_eq!(parse_log_format(None).unwrap(), LogFormat::Pretty);
    assert_eq!(parse_log_format(Some("JSON")).unwrap(), LogFormat::Json);
    assert!(parse_log_format(Some("xml")).is_err());
}

#[test]
fn only_finished_attempts_count_toward_the_limit() {
    let counted: Vec<&str> = AttemptStatus::ALL
        .into_iter()
        .filter(|s| s.counts_toward_limit())
        .map(|s| s.as_str())
        .collect();
    assert_eq!(counted, vec!["submitted", "graded"]);
}
