use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

use super::ApiError;
use crate::extractors::{AppQuery, Learner};
use crate::models::HistoryParams;
use crate::services::AppState;

/// GET /api/v1/history
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Learner(learner): Learner,
    AppQuery(params): AppQuery<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    params.validate()?;

    let records = state
        .history()
        .list_history(&learner.user_id, &params, Utc::now())
        .await?;
    Ok(Json(records))
}

/// GET /api/v1/history/{id}
pub async fn get_history_record(
    State(state): State<Arc<AppState>>,
    Learner(learner): Learner,
    Path(record_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .history()
        .get_history_record(&learner.user_id, &record_id)
        .await?;
    Ok(Json(record))
}
