use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::{ActiveLanguage, Language, LearnerContext};
use crate::services::AppState;

/// Claims issued by the account service. The learner's language settings
/// travel with the token so practice requests need no profile lookup.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub sub: String, // user_id
    pub native_language: Language,
    #[serde(default)]
    pub active_language: Option<ActiveLanguage>,
    pub exp: usize,
    pub iat: usize,
}

impl JwtClaims {
    pub fn for_learner(learner: &LearnerContext, ttl_secs: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: learner.user_id.clone(),
            native_language: learner.native_language,
            active_language: learner.active_language,
            exp: (now + ttl_secs).max(0) as usize,
            iat: now.max(0) as usize,
        }
    }

    pub fn learner(&self) -> LearnerContext {
        LearnerContext::new(self.sub.clone(), self.native_language, self.active_language)
    }
}

#[derive(Debug)]
pub enum AuthError {
    InvalidToken,
    ExpiredToken,
    MissingToken,
    InvalidSignature,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::ExpiredToken => write!(f, "Token expired"),
            AuthError::MissingToken => write!(f, "Missing authorization token"),
            AuthError::InvalidSignature => write!(f, "Invalid token signature"),
        }
    }
}

impl std::error::Error for AuthError {}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Token issuance belongs to the account service; this is used by tests and tooling.
    pub fn generate_token(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(|_| AuthError::InvalidToken)
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let validation = Validation::default();

        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken,
            })
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)
}

/// Validates the bearer token and stores the caller's [`LearnerContext`] in
/// the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let claims = bearer_token(&headers)
        .and_then(|token| jwt_service.validate_token(token))
        .map_err(|e| {
            tracing::warn!("JWT validation failed: {}", e);
            StatusCode::UNAUTHORIZED
        })?;

    tracing::debug!(
        "Authenticated learner: {} (native: {})",
        claims.sub,
        claims.native_language
    );

    request.extensions_mut().insert(claims.learner());

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CefrLevel;

    fn learner() -> LearnerContext {
        LearnerContext::new(
            "user123",
            Language::Uk,
            Some(ActiveLanguage {
                language: Language::De,
                level: CefrLevel::B2,
            }),
        )
    }

    #[test]
    fn test_jwt_generation_and_validation() {
        let service = JwtService::new("test-secret");
        let claims = JwtClaims::for_learner(&learner(), 3600);

        let token = service.generate_token(&claims).unwrap();
        let validated = service.validate_token(&token).unwrap();

        assert_eq!(validated.learner(), learner());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = JwtService::new("secret-a")
            .generate_token(&JwtClaims::for_learner(&learner(), 3600))
            .unwrap();
        let result = JwtService::new("secret-b").validate_token(&token);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = JwtService::new("test-secret");
        let token = service
            .generate_token(&JwtClaims::for_learner(&learner(), -3600))
            .unwrap();
        assert!(matches!(
            service.validate_token(&token),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn claims_without_active_language_still_decode() {
        let service = JwtService::new("test-secret");
        let claims = JwtClaims::for_learner(&LearnerContext::new("u-2", Language::En, None), 60);
        let token = service.generate_token(&claims).unwrap();
        let validated = service.validate_token(&token).unwrap();
        assert_eq!(validated.active_language, None);
    }
}
