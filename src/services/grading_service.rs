use crate::models::answer::Answer;
use crate::models::question::QuestionWithChoices;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerGrade {
    pub answer_id: Uuid,
    pub question_id: Uuid,
    pub is_correct: Option<bool>,
    pub points_earned: Option<Decimal>,
    pub auto_graded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeReport {
    pub answers: Vec<AnswerGrade>,
    pub earned_points: Decimal,
    pub total_points: Decimal,
    /// Percentage rounded to two decimals.
    pub score: Decimal,
    /// False while any answer still waits for a manual grade.
    pub fully_graded: bool,
}

pub struct GradingService;

impl GradingService {
    /// Auto-grades objective answers and tallies the attempt. Answers to
    /// short-answer and essay questions keep whatever manual grade they
    /// already carry (none, right after submission).
    pub fn grade(questions: &[QuestionWithChoices], answers: &[Answer]) -> GradeReport {
        let graded = answers
            .iter()
            .filter_map(|answer| {
                let question = questions
                    .iter()
                    .find(|q| q.question.id == answer.question_id)?;
                Some(Self::grade_answer(question, answer))
            })
            .collect();
        Self::tally(questions, graded)
    }

    pub fn grade_answer(question: &QuestionWithChoices, answer: &Answer) -> AnswerGrade {
        if !question.question.question_type.is_auto_gradable() {
            return AnswerGrade {
                answer_id: answer.id,
                question_id: answer.question_id,
                is_correct: answer.is_correct,
                points_earned: answer.points_earned,
                auto_graded: false,
            };
        }

        // Only the selected choice's own flag counts, however many other
        // choices are marked correct.
        let is_correct = answer
            .selected_choice_id
            .and_then(|id| question.choice(id))
            .map(|choice| choice.is_correct)
            .unwrap_or(false);
        let points_earned = if is_correct {
            Decimal::from(question.question.points)
        } else {
            Decimal::ZERO
        };

        AnswerGrade {
            answer_id: answer.id,
            question_id: answer.question_id,
            is_correct: Some(is_correct),
            points_earned: Some(points_earned),
            auto_graded: true,
        }
    }

    /// Recomputes the totals from grades as they stand, without touching
    /// any individual grade.
    pub fn tally(questions: &[QuestionWithChoices], answers: Vec<AnswerGrade>) -> GradeReport {
        let total_points = Self::total_points(questions);
        let earned_points: Decimal = answers.iter().filter_map(|a| a.points_earned).sum();
        let fully_graded = answers.iter().all(|a| a.points_earned.is_some());

        GradeReport {
            score: Self::score_percentage(earned_points, total_points),
            answers,
            earned_points,
            total_points,
            fully_graded,
        }
    }

    pub fn stored_grades(answers: &[Answer]) -> Vec<AnswerGrade> {
        answers
            .iter()
            .map(|a| AnswerGrade {
                answer_id: a.id,
                question_id: a.question_id,
                is_correct: a.is_correct,
                points_earned: a.points_earned,
                auto_graded: false,
            })
            .collect()
    }

    pub fn total_points(questions: &[QuestionWithChoices]) -> Decimal {
        questions
            .iter()
            .map(|q| Decimal::from(q.question.points))
            .sum()
    }

    /// An exam worth no points scores 0.
    pub fn score_percentage(earned: Decimal, total: Decimal) -> Decimal {
        if total <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (earned * Decimal::from(100) / total).round_dp(2)
    }

    pub fn is_passed(score: Option<Decimal>, passing_score: i32) -> bool {
        match score {
            Some(score) => score >= Decimal::from(passing_score),
            None => false,
        }
    }
}
