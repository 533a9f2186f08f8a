use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::metrics::ANSWERS_SUBMITTED_TOTAL;
use crate::models::attempt::MAX_TIME_SPENT_SECONDS;
use crate::models::{Attempt, AttemptStatus, GradedResult, SubmitAnswerRequest};
use crate::store::Store;
use crate::utils::normalize::normalize_answer;

use super::ServiceError;

/// Classifies a submission against the expected answer.
pub fn classify(submitted: Option<&str>, correct_answer: &str) -> AttemptStatus {
    let normalized = submitted.map(normalize_answer).unwrap_or_default();
    if normalized.is_empty() {
        AttemptStatus::Skip
    } else if normalized == normalize_answer(correct_answer) {
        AttemptStatus::Correct
    } else {
        AttemptStatus::Incorrect
    }
}

pub struct GradingService {
    store: Arc<dyn Store>,
}

impl GradingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Grades one answer and records exactly one attempt for it.
    pub async fn submit_answer(
        &self,
        user_id: &str,
        exercise_id: i64,
        req: &SubmitAnswerRequest,
        now: DateTime<Utc>,
    ) -> Result<GradedResult, ServiceError> {
        if !(0..=MAX_TIME_SPENT_SECONDS).contains(&req.time_spent_seconds) {
            return Err(ServiceError::validation(format!(
                "time_spent_seconds must be between 0 and {}",
                MAX_TIME_SPENT_SECONDS
            )));
        }

        let exercise = self
            .store
            .find_exercise(exercise_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Exercise {} not found", exercise_id)))?;

        let status = classify(req.answer.as_deref(), &exercise.correct_answer);
        let stored_answer = match status {
            AttemptStatus::Skip => None,
            _ => req.answer.clone(),
        };

        let attempt = Attempt {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            exercise_id,
            answer: stored_answer,
            status,
            time_spent_seconds: req.time_spent_seconds,
            completed_at: now,
        };

        tracing::info!(
            "Grading answer: user={}, exercise={}, status={}",
            user_id,
            exercise_id,
            status.as_str()
        );

        self.store.insert_attempt(&attempt).await?;

        ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[status.as_str()])
            .inc();

        Ok(GradedResult {
            attempt_id: attempt.id,
            exercise_id,
            topic: exercise.topic.clone(),
            level: exercise.level,
            exercise_type: exercise.exercise_type,
            question_text: exercise.question_text.clone(),
            correct_option_key: exercise.correct_option_key(),
            options: exercise.options,
            correct_answer: exercise.correct_answer,
            user_answer: attempt.answer,
            status,
            is_correct: status == AttemptStatus::Correct,
            question_translation: exercise.translation,
            completed_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exercise::fixtures::{multiple_choice, translation};
    use crate::models::CefrLevel;
    use crate::store::InMemoryStore;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 20, 18, 45, 0).unwrap()
    }

    fn request(answer: Option<&str>, time_spent_seconds: i64) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            answer: answer.map(str::to_string),
            time_spent_seconds,
        }
    }

    async fn service() -> (GradingService, Arc<InMemoryStore>) {
        let store = Arc::new(
            InMemoryStore::with_exercises(vec![
                translation(1, "Present perfect", CefrLevel::B1),
                multiple_choice(2, "Past simple", CefrLevel::A2),
            ])
            .await
            .unwrap(),
        );
        (GradingService::new(store.clone()), store)
    }

    #[test]
    fn classification_uses_normalized_text() {
        assert_eq!(classify(Some("  WENT!! "), "went"), AttemptStatus::Correct);
        assert_eq!(classify(Some("goes"), "went"), AttemptStatus::Incorrect);
        assert_eq!(classify(Some(" ?! "), "went"), AttemptStatus::Skip);
        assert_eq!(classify(None, "went"), AttemptStatus::Skip);
    }

    #[tokio::test]
    async fn correct_multiple_choice_answer_reports_option_letter() {
        let (service, store) = service().await;
        let result = service
            .submit_answer("u-1", 2, &request(Some("Went."), 12), now())
            .await
            .unwrap();

        assert_eq!(result.status, AttemptStatus::Correct);
        assert!(result.is_correct);
        assert_eq!(result.correct_option_key.as_deref(), Some("B"));
        assert_eq!(result.user_answer.as_deref(), Some("Went."));
        assert_eq!(
            result.question_translation.as_deref(),
            Some("Вчора я ходив до магазину")
        );

        let stored = store.attempts_of("u-1").await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, result.attempt_id);
        assert_eq!(stored[0].completed_at, now());
    }

    #[tokio::test]
    async fn translation_is_graded_case_and_punctuation_insensitive() {
        let (service, _) = service().await;
        let result = service
            .submit_answer("u-1", 1, &request(Some("я живу тут 5 років..."), 40), now())
            .await
            .unwrap();
        assert_eq!(result.status, AttemptStatus::Correct);
        assert_eq!(result.correct_option_key, None);
        assert_eq!(result.correct_answer, "Я живу тут 5 років");
    }

    #[tokio::test]
    async fn blank_answer_is_stored_as_skip_without_answer() {
        let (service, store) = service().await;
        let result = service
            .submit_answer("u-1", 2, &request(Some("   "), 3), now())
            .await
            .unwrap();

        assert_eq!(result.status, AttemptStatus::Skip);
        assert!(!result.is_correct);
        assert_eq!(result.user_answer, None);
        assert_eq!(store.attempts_of("u-1").await[0].answer, None);
    }

    #[tokio::test]
    async fn unknown_exercise_writes_nothing() {
        let (service, store) = service().await;
        let err = service
            .submit_answer("u-1", 99, &request(Some("went"), 3), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
        assert!(store.attempts_of("u-1").await.is_empty());
    }

    #[tokio::test]
    async fn negative_time_is_rejected_before_any_write() {
        let (service, store) = service().await;
        let err = service
            .submit_answer("u-1", 2, &request(Some("went"), -1), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(store.attempts_of("u-1").await.is_empty());
    }

    #[tokio::test]
    async fn time_beyond_one_day_is_rejected_before_any_write() {
        let (service, store) = service().await;
        let err = service
            .submit_answer("u-1", 2, &request(Some("went"), i64::MAX), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let accepted = service
            .submit_answer("u-1", 2, &request(Some("went"), MAX_TIME_SPENT_SECONDS), now())
            .await;
        assert!(accepted.is_ok());
        assert_eq!(store.attempts_of("u-1").await.len(), 1);
    }

    #[tokio::test]
    async fn identical_submissions_are_separate_attempts() {
        let (service, store) = service().await;
        let first = service
            .submit_answer("u-1", 2, &request(Some("gone"), 5), now())
            .await
            .unwrap();
        let second = service
            .submit_answer("u-1", 2, &request(Some("gone"), 5), now())
            .await
            .unwrap();
        assert_ne!(first.attempt_id, second.attempt_id);
        assert_eq!(first.status, AttemptStatus::Incorrect);
        assert_eq!(store.attempts_of("u-1").await.len(), 2);
    }
}
