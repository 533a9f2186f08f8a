use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use super::ApiError;
use crate::extractors::{AppQuery, Learner};
use crate::models::{Language, Period};
use crate::services::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQuery {
    /// Practiced language, matched against question or answer language.
    pub language: Option<Language>,
    #[serde(default)]
    pub period: Period,
}

/// GET /api/v1/statistics/overview
pub async fn get_overview(
    State(state): State<Arc<AppState>>,
    Learner(learner): Learner,
    AppQuery(query): AppQuery<StatisticsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let overview = state
        .statistics()
        .get_overview(&learner.user_id, query.language, query.period, Utc::now())
        .await?;
    Ok(Json(overview))
}

/// GET /api/v1/statistics/performance
pub async fn get_performance(
    State(state): State<Arc<AppState>>,
    Learner(learner): Learner,
    AppQuery(query): AppQuery<StatisticsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let performance = state
        .statistics()
        .get_performance(&learner.user_id, query.language, query.period, Utc::now())
        .await?;
    Ok(Json(performance))
}
