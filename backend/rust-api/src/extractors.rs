use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::LearnerContext;

fn bad_request(message: String) -> Response {
    tracing::warn!("{}", message);
    let error_response = json!({
        "message": message,
        "status": 400
    });
    (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
}

/// JSON body extractor that answers malformed bodies with a JSON error.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(bad_request(format!(
                "Failed to parse JSON request body: {}",
                rejection
            ))),
        }
    }
}

/// Query string extractor with the same JSON error shape as [`AppJson`].
pub struct AppQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for AppQuery<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(AppQuery(value)),
            Err(rejection) => Err(bad_request(format!(
                "Invalid query parameters: {}",
                rejection
            ))),
        }
    }
}

/// Caller identity placed in the extensions by `auth_middleware`.
pub struct Learner(pub LearnerContext);

impl<S> FromRequestParts<S> for Learner
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<LearnerContext>()
            .cloned()
            .map(Learner)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
