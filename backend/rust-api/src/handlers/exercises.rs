use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

use super::ApiError;
use crate::extractors::{AppJson, AppQuery, Learner};
use crate::models::{NextExerciseQuery, SubmitAnswerRequest};
use crate::services::AppState;

/// GET /api/v1/exercises/topics
pub async fn list_topics(
    State(state): State<Arc<AppState>>,
    Learner(learner): Learner,
) -> Result<impl IntoResponse, ApiError> {
    let topics = state.selection().list_topics(&learner).await?;
    Ok(Json(topics))
}

/// GET /api/v1/exercises/next?topic=...&difficulty=...&exclude_id=...
pub async fn next_exercise(
    State(state): State<Arc<AppState>>,
    Learner(learner): Learner,
    AppQuery(query): AppQuery<NextExerciseQuery>,
) -> Result<impl IntoResponse, ApiError> {
    query.validate()?;

    let question = state
        .selection()
        .next_exercise(&learner, &query, Utc::now())
        .await?;
    Ok(Json(question))
}

/// POST /api/v1/exercises/{id}/answers
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Learner(learner): Learner,
    Path(exercise_id): Path<i64>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let result = state
        .grading()
        .submit_answer(&learner.user_id, exercise_id, &req, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}
