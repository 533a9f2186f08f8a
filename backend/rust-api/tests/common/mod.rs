#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use lingua_api::{
    config::Config,
    create_router,
    middlewares::auth::{JwtClaims, JwtService},
    models::{
        ActiveLanguage, Attempt, AttemptStatus, CefrLevel, Exercise, ExerciseOptions,
        ExerciseType, Language, LearnerContext,
    },
    services::AppState,
    store::{InMemoryStore, Store},
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub config: Config,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    pub fn token(&self, learner: &LearnerContext) -> String {
        JwtService::new(&self.config.jwt_secret)
            .generate_token(&JwtClaims::for_learner(learner, 3600))
            .unwrap()
    }

    pub async fn get(&self, uri: &str, learner: &LearnerContext) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {}", self.token(learner)))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        learner: &LearnerContext,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("authorization", format!("Bearer {}", self.token(learner)))
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();
        self.send(request).await
    }

    pub async fn record(
        &self,
        user_id: &str,
        exercise_id: i64,
        status: AttemptStatus,
        completed_at: DateTime<Utc>,
    ) -> String {
        let attempt = Attempt {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            exercise_id,
            answer: status.is_answered().then(|| "answer".to_string()),
            status,
            time_spent_seconds: 60,
            completed_at,
        };
        self.store.insert_attempt(&attempt).await.unwrap();
        attempt.id
    }
}

pub async fn create_test_app(exercises: Vec<Exercise>) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let config = Config {
        jwt_secret: "integration-test-secret".to_string(),
        metrics_auth: "metrics:secret".to_string(),
        ..Config::default()
    };
    let store = Arc::new(
        InMemoryStore::with_exercises(exercises)
            .await
            .expect("Failed to seed test exercises"),
    );
    let state = AppState::with_store(config.clone(), store.clone())
        .expect("Failed to initialize test app state");

    TestApp {
        router: create_router(Arc::new(state)),
        store,
        config,
    }
}

/// Ukrainian speaker learning English at `level`.
pub fn learner(user_id: &str, level: CefrLevel) -> LearnerContext {
    LearnerContext::new(
        user_id,
        Language::Uk,
        Some(ActiveLanguage {
            language: Language::En,
            level,
        }),
    )
}

pub fn unique_user() -> String {
    format!("test-user-{}", Uuid::new_v4())
}

pub fn translation(id: i64, topic: &str, level: CefrLevel) -> Exercise {
    Exercise {
        id,
        topic: topic.to_string(),
        level,
        exercise_type: ExerciseType::SentenceTranslation,
        question_text: "I have lived here for 5 years".to_string(),
        question_language: Language::En,
        correct_answer: "Я живу тут 5 років".to_string(),
        answer_language: Language::Uk,
        translation: None,
        translation_language: None,
        options: None,
        is_active: true,
    }
}

pub fn german_translation(id: i64, topic: &str, level: CefrLevel) -> Exercise {
    Exercise {
        question_text: "Ich wohne hier".to_string(),
        question_language: Language::De,
        correct_answer: "Я живу тут".to_string(),
        ..translation(id, topic, level)
    }
}

pub fn multiple_choice(id: i64, topic: &str, level: CefrLevel) -> Exercise {
    let options: ExerciseOptions = [("A", "go"), ("B", "went"), ("C", "gone"), ("D", "going")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Exercise {
        id,
        topic: topic.to_string(),
        level,
        exercise_type: ExerciseType::MultipleChoice,
        question_text: "Yesterday I ___ to the store".to_string(),
        question_language: Language::En,
        correct_answer: "went".to_string(),
        answer_language: Language::En,
        translation: Some("Вчора я ходив до магазину".to_string()),
        translation_language: Some(Language::Uk),
        options: Some(options),
        is_active: true,
    }
}

pub fn fill_blank(id: i64, topic: &str, level: CefrLevel) -> Exercise {
    Exercise {
        id,
        topic: topic.to_string(),
        level,
        exercise_type: ExerciseType::FillBlank,
        question_text: "She ___ a doctor".to_string(),
        question_language: Language::En,
        correct_answer: "is".to_string(),
        answer_language: Language::En,
        translation: Some("Вона лікарка".to_string()),
        translation_language: Some(Language::Uk),
        options: None,
        is_active: true,
    }
}
