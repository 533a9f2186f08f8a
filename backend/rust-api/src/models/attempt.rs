use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::exercise::{CefrLevel, Exercise, ExerciseOptions, ExerciseType, Language};
use super::statistics::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Correct,
    Incorrect,
    Skip,
}

impl AttemptStatus {
    pub const ALL: [AttemptStatus; 3] = [
        AttemptStatus::Correct,
        AttemptStatus::Incorrect,
        AttemptStatus::Skip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Correct => "correct",
            AttemptStatus::Incorrect => "incorrect",
            AttemptStatus::Skip => "skip",
        }
    }

    /// Skipped attempts do not count as answered.
    pub fn is_answered(&self) -> bool {
        !matches!(self, AttemptStatus::Skip)
    }
}

/// One submission, append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub user_id: String,
    pub exercise_id: i64,
    pub answer: Option<String>,
    pub status: AttemptStatus,
    pub time_spent_seconds: i64,
    pub completed_at: DateTime<Utc>,
}

impl Attempt {
    /// A skip carries no answer, answered attempts always carry one.
    pub fn check_consistency(&self) -> Result<(), String> {
        let has_answer = self
            .answer
            .as_deref()
            .map(|answer| !answer.trim().is_empty())
            .unwrap_or(false);
        if self.time_spent_seconds < 0 {
            return Err("time_spent_seconds must not be negative".to_string());
        }
        match (self.status, has_answer) {
            (AttemptStatus::Skip, true) => Err("skipped attempt must not store an answer".into()),
            (AttemptStatus::Correct | AttemptStatus::Incorrect, false) => {
                Err(format!("'{}' attempt requires an answer", self.status.as_str()))
            }
            _ => Ok(()),
        }
    }
}

/// Exercise fields embedded into history reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSummary {
    pub id: i64,
    pub topic: String,
    pub level: CefrLevel,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    pub question_text: String,
    pub question_language: Language,
    pub answer_language: Language,
    pub correct_answer: String,
    pub translation: Option<String>,
    pub options: Option<ExerciseOptions>,
}

impl From<&Exercise> for ExerciseSummary {
    fn from(exercise: &Exercise) -> Self {
        Self {
            id: exercise.id,
            topic: exercise.topic.clone(),
            level: exercise.level,
            exercise_type: exercise.exercise_type,
            question_text: exercise.question_text.clone(),
            question_language: exercise.question_language,
            answer_language: exercise.answer_language,
            correct_answer: exercise.correct_answer.clone(),
            translation: exercise.translation.clone(),
            options: exercise.options.clone(),
        }
    }
}

impl ExerciseSummary {
    /// Language filter of history and statistics: question or answer side.
    pub fn involves_language(&self, language: Language) -> bool {
        self.question_language == language || self.answer_language == language
    }
}

/// Attempt joined with the exercise it was made against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptView {
    pub id: String,
    pub user_id: String,
    pub answer: Option<String>,
    pub status: AttemptStatus,
    pub is_correct: bool,
    pub time_spent_seconds: i64,
    pub completed_at: DateTime<Utc>,
    pub exercise: ExerciseSummary,
}

impl AttemptView {
    pub fn new(attempt: Attempt, exercise: ExerciseSummary) -> Self {
        Self {
            id: attempt.id,
            user_id: attempt.user_id,
            answer: attempt.answer,
            is_correct: attempt.status == AttemptStatus::Correct,
            status: attempt.status,
            time_spent_seconds: attempt.time_spent_seconds,
            completed_at: attempt.completed_at,
            exercise,
        }
    }
}

/// Longest time one attempt may report.
pub const MAX_TIME_SPENT_SECONDS: i64 = 86_400;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[serde(default)]
    pub answer: Option<String>,

    #[validate(range(
        min = 0,
        max = 86_400,
        message = "time_spent_seconds must be between 0 and 86400"
    ))]
    pub time_spent_seconds: i64,
}

/// Outcome of grading one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedResult {
    pub attempt_id: String,
    pub exercise_id: i64,
    pub topic: String,
    pub level: CefrLevel,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    pub question_text: String,
    pub options: Option<ExerciseOptions>,
    pub correct_answer: String,
    pub user_answer: Option<String>,
    pub status: AttemptStatus,
    pub is_correct: bool,
    pub question_translation: Option<String>,
    pub correct_option_key: Option<String>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filters for reading a user's attempt history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub user_id: String,
    pub language: Option<Language>,
    pub level: Option<CefrLevel>,
    pub status: Option<AttemptStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub order: SortOrder,
    pub limit: usize,
    pub offset: usize,
}

impl HistoryQuery {
    pub fn for_user(user_id: impl Into<String>, limit: usize) -> Self {
        Self {
            user_id: user_id.into(),
            language: None,
            level: None,
            status: None,
            from: None,
            to: None,
            order: SortOrder::Desc,
            limit,
            offset: 0,
        }
    }

    /// Applies every filter except the user and pagination.
    pub fn matches(&self, view: &AttemptView) -> bool {
        if let Some(language) = self.language {
            if !view.exercise.involves_language(language) {
                return false;
            }
        }
        if let Some(level) = self.level {
            if view.exercise.level != level {
                return false;
            }
        }
        if let Some(status) = self.status {
            if view.status != status {
                return false;
            }
        }
        if let Some(from) = self.from {
            if view.completed_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if view.completed_at > to {
                return false;
            }
        }
        true
    }
}

/// Query of `GET /api/v1/history`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct HistoryParams {
    #[serde(default)]
    pub order: SortOrder,
    pub language: Option<Language>,
    pub level: Option<CefrLevel>,
    pub status: Option<AttemptStatus>,
    /// Takes precedence over `date_from`/`date_to`.
    pub period: Option<Period>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<usize>,
    #[serde(default)]
    #[validate(range(max = 1_000_000, message = "offset must not exceed 1000000"))]
    pub offset: usize,
}
