//! Persistence contract of the practice core.
//!
//! The services only talk to [`Store`]; `MongoStore` backs production and
//! `InMemoryStore` backs tests and local experiments.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    Attempt, AttemptStatus, AttemptView, CefrLevel, Exercise, HistoryQuery, LanguagePair,
};

pub mod memory;
pub mod mongo;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;

/// An attempt with `status` completed strictly after `since` keeps its exercise
/// out of selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionCutoff {
    pub status: AttemptStatus,
    pub since: DateTime<Utc>,
}

impl ExclusionCutoff {
    pub fn covers(&self, status: AttemptStatus, completed_at: DateTime<Utc>) -> bool {
        self.status == status && completed_at > self.since
    }
}

/// Selection criteria for one random exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseCriteria {
    pub topic: String,
    pub level: CefrLevel,
    pub pair: LanguagePair,
    pub excluded_ids: HashSet<i64>,
}

impl ExerciseCriteria {
    pub fn matches(&self, exercise: &Exercise) -> bool {
        exercise.is_active
            && exercise.topic == self.topic
            && exercise.level == self.level
            && exercise.matches_language_pair(self.pair.native, self.pair.active)
            && !self.excluded_ids.contains(&exercise.id)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<()>;

    /// Distinct topics of active exercises practicable with `pair`, sorted.
    async fn list_topics(&self, pair: LanguagePair) -> Result<Vec<String>>;

    /// One uniformly random exercise matching `criteria`.
    async fn sample_exercise(&self, criteria: &ExerciseCriteria) -> Result<Option<Exercise>>;

    async fn find_exercise(&self, id: i64) -> Result<Option<Exercise>>;

    /// Ids of exercises that have at least one attempt of `user_id` covered by a cutoff.
    async fn excluded_exercise_ids(
        &self,
        user_id: &str,
        cutoffs: &[ExclusionCutoff],
    ) -> Result<HashSet<i64>>;

    /// Appends one attempt. Called exactly once per graded submission.
    async fn insert_attempt(&self, attempt: &Attempt) -> Result<()>;

    async fn find_attempts(&self, query: &HistoryQuery) -> Result<Vec<AttemptView>>;

    /// Attempt `attempt_id` if it exists and belongs to `user_id`.
    async fn find_attempt(&self, user_id: &str, attempt_id: &str) -> Result<Option<AttemptView>>;
}
