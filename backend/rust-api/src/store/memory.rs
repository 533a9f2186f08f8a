use std::collections::{BTreeSet, HashSet};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use tokio::sync::RwLock;

use super::{ExclusionCutoff, ExerciseCriteria, Store};
use crate::models::{
    Attempt, AttemptView, Exercise, ExerciseSummary, HistoryQuery, LanguagePair, SortOrder,
};

/// Process-local store with the same query semantics as `MongoStore`.
#[derive(Default)]
pub struct InMemoryStore {
    exercises: RwLock<Vec<Exercise>>,
    attempts: RwLock<Vec<Attempt>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_exercises(exercises: Vec<Exercise>) -> Result<Self> {
        let store = Self::new();
        for exercise in exercises {
            store.add_exercise(exercise).await?;
        }
        Ok(store)
    }

    /// Adds content; rejects inconsistent exercises and duplicate ids.
    pub async fn add_exercise(&self, exercise: Exercise) -> Result<()> {
        exercise
            .validate()
            .map_err(|reason| anyhow!("Invalid exercise {}: {}", exercise.id, reason))?;

        let mut exercises = self.exercises.write().await;
        if exercises.iter().any(|existing| existing.id == exercise.id) {
            bail!("Exercise {} already exists", exercise.id);
        }
        exercises.push(exercise);
        Ok(())
    }

    /// Every stored attempt of `user_id`, oldest first.
    pub async fn attempts_of(&self, user_id: &str) -> Vec<Attempt> {
        let attempts = self.attempts.read().await;
        let mut rows: Vec<Attempt> = attempts
            .iter()
            .filter(|attempt| attempt.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|attempt| attempt.completed_at);
        rows
    }

    async fn join(&self, attempt: &Attempt) -> Option<AttemptView> {
        let exercises = self.exercises.read().await;
        exercises
            .iter()
            .find(|exercise| exercise.id == attempt.exercise_id)
            .map(|exercise| AttemptView::new(attempt.clone(), ExerciseSummary::from(exercise)))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn list_topics(&self, pair: LanguagePair) -> Result<Vec<String>> {
        let exercises = self.exercises.read().await;
        let topics: BTreeSet<String> = exercises
            .iter()
            .filter(|exercise| {
                exercise.is_active && exercise.matches_language_pair(pair.native, pair.active)
            })
            .map(|exercise| exercise.topic.clone())
            .collect();
        Ok(topics.into_iter().collect())
    }

    async fn sample_exercise(&self, criteria: &ExerciseCriteria) -> Result<Option<Exercise>> {
        let exercises = self.exercises.read().await;
        let candidates: Vec<&Exercise> = exercises
            .iter()
            .filter(|exercise| criteria.matches(exercise))
            .collect();
        let picked = candidates.choose(&mut rand::rng()).map(|exercise| (*exercise).clone());
        Ok(picked)
    }

    async fn find_exercise(&self, id: i64) -> Result<Option<Exercise>> {
        let exercises = self.exercises.read().await;
        Ok(exercises.iter().find(|exercise| exercise.id == id).cloned())
    }

    async fn excluded_exercise_ids(
        &self,
        user_id: &str,
        cutoffs: &[ExclusionCutoff],
    ) -> Result<HashSet<i64>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .iter()
            .filter(|attempt| attempt.user_id == user_id)
            .filter(|attempt| {
                cutoffs
                    .iter()
                    .any(|cutoff| cutoff.covers(attempt.status, attempt.completed_at))
            })
            .map(|attempt| attempt.exercise_id)
            .collect())
    }

    async fn insert_attempt(&self, attempt: &Attempt) -> Result<()> {
        attempt
            .check_consistency()
            .map_err(|reason| anyhow!("Refusing to store attempt {}: {}", attempt.id, reason))?;

        let mut attempts = self.attempts.write().await;
        if attempts.iter().any(|existing| existing.id == attempt.id) {
            bail!("Attempt {} already exists", attempt.id);
        }
        attempts.push(attempt.clone());
        Ok(())
    }

    async fn find_attempts(&self, query: &HistoryQuery) -> Result<Vec<AttemptView>> {
        let owned: Vec<Attempt> = {
            let attempts = self.attempts.read().await;
            attempts
                .iter()
                .filter(|attempt| attempt.user_id == query.user_id)
                .cloned()
                .collect()
        };

        let mut views = Vec::with_capacity(owned.len());
        for attempt in &owned {
            if let Some(view) = self.join(attempt).await {
                if query.matches(&view) {
                    views.push(view);
                }
            }
        }

        match query.order {
            SortOrder::Asc => views.sort_by_key(|view| view.completed_at),
            SortOrder::Desc => views.sort_by(|a, b| b.completed_at.cmp(&a.completed_at)),
        }

        Ok(views
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn find_attempt(&self, user_id: &str, attempt_id: &str) -> Result<Option<AttemptView>> {
        let attempt = {
            let attempts = self.attempts.read().await;
            attempts
                .iter()
                .find(|attempt| attempt.id == attempt_id && attempt.user_id == user_id)
                .cloned()
        };
        match attempt {
            Some(attempt) => Ok(self.join(&attempt).await),
            None => Ok(None),
        }
    }
}
