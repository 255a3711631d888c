use crate::error::{Error, Result};
use crate::models::question::QuestionWithChoices;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row per (attempt, question); unanswered questions have none.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Answer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_choice_id: Option<Uuid>,
    pub text_answer: String,
    pub is_correct: Option<bool>,
    pub points_earned: Option<Decimal>,
    pub feedback: String,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub selected_choice_id: Option<Uuid>,
    pub text_answer: Option<String>,
}

impl AnswerPayload {
    /// Objective questions take a choice of their own; written questions
    /// take text and no choice.
    pub fn check_against(&self, question: &QuestionWithChoices) -> Result<()> {
        let q = &question.question;
        if q.question_type.is_auto_gradable() {
            let choice_id = self.selected_choice_id.ok_or_else(|| {
                Error::BadRequest(format!("Question {} expects a selected choice", q.id))
            })?;
            if question.choice(choice_id).is_none() {
                return Err(Error::NotFound(format!(
                    "Choice {} does not belong to question {}",
                    choice_id, q.id
                )));
            }
        } else {
            if self.selected_choice_id.is_some() {
                return Err(Error::BadRequest(format!(
                    "Question {} expects a written answer, not a choice",
                    q.id
                )));
            }
            if self.text_answer.is_none() {
                return Err(Error::BadRequest(format!(
                    "Question {} expects a written answer",
                    q.id
                )));
            }
        }
        Ok(())
    }
}
