mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{create_test_app, german_translation, learner, multiple_choice, translation, unique_user};
use lingua_api::models::{AttemptStatus, CefrLevel};

#[tokio::test]
async fn test_overview_accuracy_excludes_skips() {
    let app = create_test_app(vec![translation(1, "Articles", CefrLevel::A1)]).await;
    let user_id = unique_user();
    let now = Utc::now();
    for (status, count) in [
        (AttemptStatus::Correct, 4),
        (AttemptStatus::Incorrect, 3),
        (AttemptStatus::Skip, 3),
    ] {
        for _ in 0..count {
            app.record(&user_id, 1, status, now).await;
        }
    }

    let (status, json) = app
        .get("/api/v1/statistics/overview", &learner(&user_id, CefrLevel::A1))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_exercises"], 10);
    assert_eq!(json["total_answered"], 7);
    assert_eq!(json["accuracy"], 57.1);
    // 10 attempts x 60 seconds
    assert_eq!(json["total_study_hours"], 0.2);
    assert_eq!(json["current_streak_days"], 1);
    assert_eq!(json["is_today_completed"], true);
}

#[tokio::test]
async fn test_streak_counts_today_and_previous_days() {
    let app = create_test_app(vec![translation(1, "Articles", CefrLevel::A1)]).await;
    let user_id = unique_user();
    let now = Utc::now();
    for days_ago in [0, 1, 2, 4] {
        app.record(&user_id, 1, AttemptStatus::Incorrect, now - Duration::days(days_ago))
            .await;
    }

    let (_, json) = app
        .get("/api/v1/statistics/overview", &learner(&user_id, CefrLevel::A1))
        .await;
    assert_eq!(json["current_streak_days"], 3);
    assert_eq!(json["is_today_completed"], true);
}

#[tokio::test]
async fn test_streak_survives_a_day_without_practice() {
    let app = create_test_app(vec![translation(1, "Articles", CefrLevel::A1)]).await;
    let user_id = unique_user();
    let now = Utc::now();
    for days_ago in [1, 2] {
        app.record(&user_id, 1, AttemptStatus::Incorrect, now - Duration::days(days_ago))
            .await;
    }

    let (_, json) = app
        .get("/api/v1/statistics/overview", &learner(&user_id, CefrLevel::A1))
        .await;
    assert_eq!(json["current_streak_days"], 2);
    assert_eq!(json["is_today_completed"], false);
}

#[tokio::test]
async fn test_streak_breaks_at_gap() {
    let app = create_test_app(vec![translation(1, "Articles", CefrLevel::A1)]).await;
    let user_id = unique_user();
    let now = Utc::now();
    for days_ago in [1, 3] {
        app.record(&user_id, 1, AttemptStatus::Incorrect, now - Duration::days(days_ago))
            .await;
    }

    let (_, json) = app
        .get("/api/v1/statistics/overview", &learner(&user_id, CefrLevel::A1))
        .await;
    assert_eq!(json["current_streak_days"], 1);
    assert_eq!(json["is_today_completed"], false);
}

#[tokio::test]
async fn test_overview_without_history_is_zeroed() {
    let app = create_test_app(vec![]).await;
    let (status, json) = app
        .get("/api/v1/statistics/overview?period=7d", &learner(&unique_user(), CefrLevel::A1))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_exercises"], 0);
    assert_eq!(json["accuracy"], 0.0);
    assert_eq!(json["current_streak_days"], 0);
    assert_eq!(json["is_today_completed"], false);
}

#[tokio::test]
async fn test_period_and_language_filters() {
    let app = create_test_app(vec![
        translation(1, "Articles", CefrLevel::A1),
        german_translation(2, "Cases", CefrLevel::A1),
    ])
    .await;
    let user_id = unique_user();
    let now = Utc::now();
    app.record(&user_id, 1, AttemptStatus::Correct, now - Duration::days(2))
        .await;
    app.record(&user_id, 1, AttemptStatus::Correct, now - Duration::days(10))
        .await;
    app.record(&user_id, 2, AttemptStatus::Incorrect, now - Duration::days(2))
        .await;
    let user = learner(&user_id, CefrLevel::A1);

    let (_, json) = app.get("/api/v1/statistics/overview?period=7d", &user).await;
    assert_eq!(json["total_exercises"], 2);

    let (_, json) = app
        .get("/api/v1/statistics/overview?language=de", &user)
        .await;
    assert_eq!(json["total_exercises"], 1);
    assert_eq!(json["accuracy"], 0.0);

    let (_, json) = app
        .get("/api/v1/statistics/overview?language=en&period=30d", &user)
        .await;
    assert_eq!(json["total_exercises"], 2);
    assert_eq!(json["accuracy"], 100.0);
}

#[tokio::test]
async fn test_unknown_period_is_rejected() {
    let app = create_test_app(vec![]).await;
    let (status, json) = app
        .get("/api/v1/statistics/overview?period=2w", &learner(&unique_user(), CefrLevel::A1))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_topic_mastery_in_performance() {
    let app = create_test_app(vec![
        translation(1, "Articles", CefrLevel::A1),
        multiple_choice(2, "Past simple", CefrLevel::A2),
    ])
    .await;
    let user_id = unique_user();
    let now = Utc::now();
    for i in 0..25 {
        let status = if i < 23 {
            AttemptStatus::Correct
        } else {
            AttemptStatus::Incorrect
        };
        app.record(&user_id, 1, status, now).await;
    }
    for i in 0..20 {
        let status = if i < 8 {
            AttemptStatus::Correct
        } else {
            AttemptStatus::Incorrect
        };
        app.record(&user_id, 2, status, now).await;
    }

    let (status, json) = app
        .get("/api/v1/statistics/performance", &learner(&user_id, CefrLevel::A1))
        .await;
    assert_eq!(status, StatusCode::OK);

    let topics = json["topics"].as_array().unwrap();
    let articles = topics.iter().find(|t| t["topic"] == "Articles").unwrap();
    assert_eq!(articles["total_answered"], 25);
    assert_eq!(articles["accuracy"], 92.0);
    assert_eq!(articles["status"], "mastered");

    assert_eq!(json["top_topics"][0]["topic"], "Articles");
    let weak = json["weak_topics"].as_array().unwrap();
    assert_eq!(weak.len(), 1);
    assert_eq!(weak[0]["topic"], "Past simple");
    assert_eq!(weak[0]["accuracy"], 40.0);
    assert_eq!(weak[0]["status"], "needs_practice");
}

#[tokio::test]
async fn test_level_mastery_in_performance() {
    let app = create_test_app(vec![translation(1, "Present perfect", CefrLevel::B1)]).await;
    let user_id = unique_user();
    let now = Utc::now();
    for i in 0..100 {
        let status = if i < 81 {
            AttemptStatus::Correct
        } else {
            AttemptStatus::Incorrect
        };
        app.record(&user_id, 1, status, now).await;
    }

    let (_, json) = app
        .get("/api/v1/statistics/performance?period=all", &learner(&user_id, CefrLevel::B1))
        .await;

    let levels = json["levels"].as_array().unwrap();
    assert_eq!(levels.len(), 6);
    let b1 = levels.iter().find(|l| l["level"] == "B1").unwrap();
    assert_eq!(b1["total_answered"], 100);
    assert_eq!(b1["accuracy"], 81.0);
    assert_eq!(b1["mastered"], true);
    assert_eq!(b1["in_progress"], false);
}
