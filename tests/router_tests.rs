// tests/router_tests.rs
//
// Routing and auth checks that never reach the database.

mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use elearn_backend::{
    routes,
    services::{notify::ConsoleMailer, storage::LocalDiskStore},
    state::AppState,
    utils::jwt::sign_jwt,
};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

fn app() -> Router {
    let config = common::test_config("postgres://nobody@127.0.0.1:1/none");
    // Lazy pool: no connection is attempted unless a handler queries.
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("Failed to build lazy pool");

    routes::create_router(AppState {
        pool,
        store: Arc::new(LocalDiskStore::new(&config.media_root)),
        notifier: Arc::new(ConsoleMailer::new(config.default_from_email.clone())),
        config,
    })
}

fn token(role: &str) -> String {
    sign_jwt(7, role, common::JWT_SECRET, 600).unwrap()
}

async fn status_of(request: Request<Body>) -> StatusCode {
    app().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn health_is_public() {
    let status = status_of(Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_path_is_404() {
    let status = status_of(
        Request::get("/random_path_that_does_not_exist")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_paths_next_to_guarded_routes_are_404_without_a_token() {
    for path in [
        "/api/unknown",
        "/api/lessons/1/unknown",
        "/api/courses/1/unknown",
        "/api/exams/1/unknown",
    ] {
        let request = Request::get(path).body(Body::empty()).unwrap();
        assert_eq!(status_of(request).await, StatusCode::NOT_FOUND, "{}", path);
    }
}

#[tokio::test]
async fn learner_routes_require_a_token() {
    for (method, path) in [
        ("POST", "/api/lessons/1/submit"),
        ("POST", "/api/lessons/1/retry"),
        ("POST", "/api/exams/1/submit"),
        ("POST", "/api/courses/1/enroll"),
        ("GET", "/api/courses/mine"),
        ("GET", "/api/progress"),
        ("GET", "/api/attempts"),
    ] {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED, "{}", path);
    }
}

#[tokio::test]
async fn tokens_signed_with_another_secret_are_rejected() {
    let forged = sign_jwt(7, "admin", "some_other_secret", 600).unwrap();
    let request = Request::get("/api/progress")
        .header("Authorization", format!("Bearer {}", forged))
        .body(Body::empty())
        .unwrap();
    assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_learners() {
    for (method, path) in [
        ("GET", "/api/admin/submissions/writing"),
        ("POST", "/api/admin/submissions/writing/1/grade"),
        ("POST", "/api/admin/reminders"),
        ("GET", "/api/admin/emails"),
    ] {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("Authorization", format!("Bearer {}", token("user")))
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::FORBIDDEN, "{}", path);
    }
}

#[tokio::test]
async fn reminder_trigger_is_accepted_for_admins() {
    let request = Request::post("/api/admin/reminders")
        .header("Authorization", format!("Bearer {}", token("admin")))
        .body(Body::empty())
        .unwrap();
    assert_eq!(status_of(request).await, StatusCode::ACCEPTED);
}
