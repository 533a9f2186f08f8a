//! Spaced-repetition exclusion windows.
//!
//! After an attempt, the exercise stays out of selection for a window that
//! depends on the attempt outcome. The rule is turned into per-status cutoffs
//! and evaluated by the store at query time.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::models::AttemptStatus;
use crate::store::{ExclusionCutoff, Store};

use super::ServiceError;

/// Hours an exercise stays ineligible after an attempt with the given status.
const EXCLUSION_HOURS: &[(AttemptStatus, i64)] = &[
    (AttemptStatus::Correct, 336),
    (AttemptStatus::Skip, 72),
    (AttemptStatus::Incorrect, 0),
];

/// Window for `status`; zero when the outcome does not exclude.
pub fn exclusion_window(status: AttemptStatus) -> Duration {
    EXCLUSION_HOURS
        .iter()
        .find(|(candidate, _)| *candidate == status)
        .map(|(_, hours)| Duration::hours(*hours))
        .unwrap_or_else(Duration::zero)
}

/// Checks that every status has a window entry.
pub fn validate_exclusion_table() -> Result<(), String> {
    let missing: Vec<AttemptStatus> = AttemptStatus::ALL
        .iter()
        .filter(|status| !EXCLUSION_HOURS.iter().any(|(key, _)| key == *status))
        .copied()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("Exclusion windows missing for {:?}", missing))
    }
}

/// Cutoffs active at `now`. Statuses with an empty window produce none.
pub fn exclusion_cutoffs(now: DateTime<Utc>) -> Vec<ExclusionCutoff> {
    AttemptStatus::ALL
        .iter()
        .filter_map(|status| {
            let window = exclusion_window(*status);
            (window > Duration::zero()).then(|| ExclusionCutoff {
                status: *status,
                since: now - window,
            })
        })
        .collect()
}

/// True while an attempt completed at `completed_at` still excludes its exercise.
pub fn is_excluded(status: AttemptStatus, completed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - completed_at < exclusion_window(status)
}

pub struct ExclusionFilter {
    store: Arc<dyn Store>,
}

impl ExclusionFilter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Exercise ids `user_id` must not be offered at `now`.
    pub async fn excluded_ids(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<HashSet<i64>, ServiceError> {
        let cutoffs = exclusion_cutoffs(now);
        let excluded = self.store.excluded_exercise_ids(user_id, &cutoffs).await?;
        tracing::debug!(
            "Exclusion filter: user={}, excluded={}",
            user_id,
            excluded.len()
        );
        Ok(excluded)
    }
}
