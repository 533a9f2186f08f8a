use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::metrics::{EXERCISES_SERVED_TOTAL, EXERCISE_SELECTION_MISSES_TOTAL};
use crate::models::{LanguagePair, LearnerContext, NextExerciseQuery, Question};
use crate::store::{ExerciseCriteria, Store};
use crate::utils::normalize::normalize_topic;

use super::exclusion::ExclusionFilter;
use super::topic_cache::TopicCache;
use super::ServiceError;

const NO_EXERCISE_SUGGESTIONS: [&str; 3] = [
    "Try changing difficulty level",
    "Try different topic",
    "Come back later (some exercises may be on timeout)",
];

pub struct SelectionService {
    store: Arc<dyn Store>,
    topic_cache: Option<TopicCache>,
}

impl SelectionService {
    pub fn new(store: Arc<dyn Store>, topic_cache: Option<TopicCache>) -> Self {
        Self { store, topic_cache }
    }

    /// Picks one random eligible exercise for the learner and strips it down to a question.
    pub async fn next_exercise(
        &self,
        learner: &LearnerContext,
        query: &NextExerciseQuery,
        now: DateTime<Utc>,
    ) -> Result<Question, ServiceError> {
        let topic = normalize_topic(&query.topic)
            .ok_or_else(|| ServiceError::validation("Topic must not be empty"))?;
        let active = learner
            .active_language
            .ok_or_else(|| ServiceError::validation("Select an active learning language first"))?;
        let level = query.difficulty.unwrap_or(active.level);
        let pair = LanguagePair {
            native: learner.native_language,
            active: active.language,
        };

        let mut excluded_ids = ExclusionFilter::new(self.store.clone())
            .excluded_ids(&learner.user_id, now)
            .await?;
        if let Some(exclude_id) = query.exclude_id {
            excluded_ids.insert(exclude_id);
        }

        tracing::info!(
            "Selecting exercise: user={}, topic={}, level={}, pair={}->{}, excluded={}",
            learner.user_id,
            topic,
            level,
            pair.native,
            pair.active,
            excluded_ids.len()
        );

        let criteria = ExerciseCriteria {
            topic: topic.clone(),
            level,
            pair,
            excluded_ids,
        };

        match self.store.sample_exercise(&criteria).await? {
            Some(exercise) => {
                EXERCISES_SERVED_TOTAL
                    .with_label_values(&[exercise.exercise_type.as_str(), level.as_str()])
                    .inc();
                Ok(Question::from(&exercise))
            }
            None => {
                EXERCISE_SELECTION_MISSES_TOTAL
                    .with_label_values(&[level.as_str()])
                    .inc();
                tracing::info!(
                    "No eligible exercise: user={}, topic={}, level={}",
                    learner.user_id,
                    topic,
                    level
                );
                Err(ServiceError::NotFound {
                    message: format!(
                        "No exercises available for topic \"{}\" at level {}",
                        topic, level
                    ),
                    suggestions: NO_EXERCISE_SUGGESTIONS
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                })
            }
        }
    }

    /// Topics the learner can practice with their current language pair.
    pub async fn list_topics(&self, learner: &LearnerContext) -> Result<Vec<String>, ServiceError> {
        let pair = learner
            .language_pair()
            .ok_or_else(|| ServiceError::validation("Select an active learning language first"))?;

        if let Some(cache) = &self.topic_cache {
            match cache.get(pair).await {
                Ok(Some(topics)) => return Ok(topics),
                Ok(None) => {}
                Err(e) => tracing::warn!("Topic cache read failed: {:#}", e),
            }
        }

        let topics = self.store.list_topics(pair).await?;

        if let Some(cache) = &self.topic_cache {
            if let Err(e) = cache.put(pair, &topics).await {
                tracing::warn!("Topic cache write failed: {:#}", e);
            }
        }

        Ok(topics)
    }
}
