use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use validator::ValidationErrors;

use crate::services::ServiceError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound {
        message: String,
        suggestions: Vec<String>,
    },
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => ApiError::BadRequest(message),
            ServiceError::NotFound {
                message,
                suggestions,
            } => ApiError::NotFound {
                message,
                suggestions,
            },
            ServiceError::Store(e) => {
                tracing::error!("Store failure: {:#}", e);
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::BadRequest(format!("Validation error: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "message": message, "status": 400 }),
            ),
            ApiError::NotFound {
                message,
                suggestions,
            } if suggestions.is_empty() => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "message": message, "status": 404 }),
            ),
            ApiError::NotFound {
                message,
                suggestions,
            } => (
                StatusCode::NOT_FOUND,
                serde_json::json!({
                    "message": message,
                    "status": 404,
                    "suggestions": suggestions
                }),
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "message": message, "status": 500 }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_status_codes() {
        let cases = [
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST),
            (ServiceError::not_found("gone"), StatusCode::NOT_FOUND),
            (
                ServiceError::Store(anyhow::anyhow!("connection reset")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
