use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{AttemptView, HistoryParams, HistoryQuery};
use crate::store::Store;

use super::ServiceError;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;
pub const MAX_OFFSET: usize = 1_000_000;

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|at| at.and_utc())
}

fn end_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_nano_opt(23, 59, 59, 999_999_999)
        .map(|at| at.and_utc())
}

/// Resolves listing parameters into a store query. A period replaces any
/// custom date range; custom dates are inclusive whole days.
pub fn build_query(
    user_id: &str,
    params: &HistoryParams,
    now: DateTime<Utc>,
) -> Result<HistoryQuery, ServiceError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(ServiceError::validation(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }

    if params.offset > MAX_OFFSET {
        return Err(ServiceError::validation(format!(
            "offset must not exceed {}",
            MAX_OFFSET
        )));
    }

    let mut query = HistoryQuery::for_user(user_id, limit);
    query.offset = params.offset;
    query.order = params.order;
    query.language = params.language;
    query.level = params.level;
    query.status = params.status;

    match params.period {
        Some(period) => query.from = period.start(now),
        None => {
            if let (Some(from), Some(to)) = (params.date_from, params.date_to) {
                if from > to {
                    return Err(ServiceError::validation(
                        "date_from must not be after date_to",
                    ));
                }
            }
            query.from = params.date_from.and_then(start_of_day);
            query.to = params.date_to.and_then(end_of_day);
        }
    }

    Ok(query)
}

pub struct HistoryService {
    store: Arc<dyn Store>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_history(
        &self,
        user_id: &str,
        params: &HistoryParams,
        now: DateTime<Utc>,
    ) -> Result<Vec<AttemptView>, ServiceError> {
        let query = build_query(user_id, params, now)?;
        tracing::debug!(
            "Listing history: user={}, limit={}, offset={}",
            user_id,
            query.limit,
            query.offset
        );
        Ok(self.store.find_attempts(&query).await?)
    }

    /// Records of other users are reported as missing.
    pub async fn get_history_record(
        &self,
        user_id: &str,
        record_id: &str,
    ) -> Result<AttemptView, ServiceError> {
        self.store
            .find_attempt(user_id, record_id)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!("Exercise history record {} not found", record_id))
            })
    }
}
