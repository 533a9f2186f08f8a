use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    // Everything under /api/v1 except the catalog acts on behalf of a learner
    let learner_routes = Router::new()
        .nest("/exercises", exercise_routes())
        .nest("/history", history_routes())
        .nest("/statistics", statistics_routes())
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .nest("/api/v1/catalog", catalog_routes())
        .nest("/api/v1", learner_routes)
        .with_state(app_state)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn exercise_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/topics", get(handlers::exercises::list_topics))
        .route("/next", get(handlers::exercises::next_exercise))
        .route("/{id}/answers", post(handlers::exercises::submit_answer))
}

fn history_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::history::list_history))
        .route("/{id}", get(handlers::history::get_history_record))
}

fn statistics_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/overview", get(handlers::statistics::get_overview))
        .route("/performance", get(handlers::statistics::get_performance))
}

fn catalog_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/languages", get(handlers::catalog::list_languages))
        .route("/levels", get(handlers::catalog::list_levels))
        .route("/exercise-types", get(handlers::catalog::list_exercise_types))
}
