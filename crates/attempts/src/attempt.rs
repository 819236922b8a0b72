//! Attempt and answer records.

use chrono::{DateTime, Utc};
use common::{AssignmentId, AttemptId, IdempotencyKey, UserId};
use serde::{Deserialize, Serialize};

use crate::score::Score;
use crate::status::AttemptStatus;

/// Option value that marks an answer as correct, compared case-insensitively.
pub const CORRECT_OPTION: &str = "correct";

/// One answer as submitted by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerInput {
    pub question_id: i64,
    #[serde(default)]
    pub selected_option: Option<String>,
    #[serde(default)]
    pub answer_text: Option<String>,
}

impl AnswerInput {
    pub fn option(question_id: i64, selected_option: impl Into<String>) -> Self {
        Self {
            question_id,
            selected_option: Some(selected_option.into()),
            answer_text: None,
        }
    }

    pub fn text(question_id: i64, answer_text: impl Into<String>) -> Self {
        Self {
            question_id,
            selected_option: None,
            answer_text: Some(answer_text.into()),
        }
    }
}

/// A stored answer, unique per (attempt, question).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: i64,
    pub selected_option: Option<String>,
    pub answer_text: Option<String>,
    /// Set by scoring only.
    pub is_correct: Option<bool>,
}

impl Answer {
    fn grade(&self) -> bool {
        self.selected_option
            .as_deref()
            .is_some_and(|option| option.eq_ignore_ascii_case(CORRECT_OPTION))
    }
}

/// A single try at an assignment by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: AttemptId,
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub score: Option<Score>,
    pub idempotency_key: IdempotencyKey,
    /// Ordered by question id.
    pub answers: Vec<Answer>,
}

impl Attempt {
    pub(crate) fn start(
        id: AttemptId,
        assignment_id: AssignmentId,
        user_id: UserId,
        idempotency_key: IdempotencyKey,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            assignment_id,
            user_id,
            status: AttemptStatus::Pending,
            started_at: now,
            finished_at: None,
            score: None,
            idempotency_key,
            answers: Vec::new(),
        }
    }

    pub fn answer(&self, question_id: i64) -> Option<&Answer> {
        self.answers
            .binary_search_by_key(&question_id, |a| a.question_id)
            .ok()
            .map(|i| &self.answers[i])
    }

    /// Inserts or overwrites the answer for its question id.
    pub(crate) fn upsert_answer(&mut self, input: AnswerInput) {
        match self
            .answers
            .binary_search_by_key(&input.question_id, |a| a.question_id)
        {
            Ok(i) => {
                let existing = &mut self.answers[i];
                existing.selected_option = input.selected_option;
                existing.answer_text = input.answer_text;
            }
            Err(i) => self.answers.insert(
                i,
                Answer {
                    question_id: input.question_id,
                    selected_option: input.selected_option,
                    answer_text: input.answer_text,
                    is_correct: None,
                },
            ),
        }
    }

    /// Marks every answer correct or not and returns the resulting score.
    pub(crate) fn grade_answers(&mut self) -> Score {
        let mut correct = 0;
        for answer in &mut self.answers {
            let is_correct = answer.grade();
            answer.is_correct = Some(is_correct);
            if is_correct {
                correct += 1;
            }
        }
        Score::from_ratio(correct, self.answers.len())
    }

    pub(crate) fn finish(&mut self, status: AttemptStatus, now: DateTime<Utc>) {
        self.status = status;
        self.finished_at = Some(now);
    }
}
