// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{admin, course, exam, lesson, progress},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public catalog routes (courses, exams).
/// * Learner routes behind `auth_middleware`.
/// * Grading, reminder and media routes behind auth + admin checks.
/// * Global middleware (Trace, CORS, body limit for audio uploads).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // `route_layer` keeps unmatched paths out of the auth check so they fall through to 404.
    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let course_routes = Router::new()
        .route("/", get(course::list_courses))
        // Protected course routes
        .merge(
            Router::new()
                .route("/mine", get(course::my_courses))
                .route("/{id}", get(course::get_course))
                .route("/{id}/enroll", post(course::enroll))
                .route("/{id}/progress", get(progress::get_course_progress))
                .route("/{id}/certificate", get(progress::get_certificate))
                .route("/{id}/lessons/{lesson_id}", get(course::get_lesson))
                .route_layer(auth.clone()),
        );

    let lesson_routes = Router::new()
        .route("/{id}/submit", post(lesson::submit_lesson))
        .route("/{id}/retry", post(lesson::retry_lesson))
        .route_layer(auth.clone());

    let learner_routes = Router::new()
        .route("/api/progress", get(progress::progress_overview))
        .route("/api/certificates", get(progress::list_certificates))
        .route(
            "/api/certificates/{course_id}/eligibility",
            get(progress::certificate_eligibility),
        )
        .route("/api/attempts", get(exam::list_attempts))
        .route_layer(auth.clone());

    let exam_routes = Router::new()
        .route("/", get(exam::list_exams))
        .route("/{id}", get(exam::get_exam))
        .merge(
            Router::new()
                .route("/{id}/submit", post(exam::submit_exam))
                .route_layer(auth.clone()),
        );

    let admin_routes = Router::new()
        .route("/submissions/{kind}", get(admin::list_pending_submissions))
        .route("/submissions/{kind}/{id}/grade", post(admin::grade_submission))
        .route("/reminders", post(admin::trigger_reminders))
        .route(
            "/reminders/courses/{id}",
            post(admin::trigger_course_reminders),
        )
        .route("/emails", get(admin::list_sent_emails))
        // Uploaded speaking audio, for graders
        .nest_service("/media", ServeDir::new(&state.config.media_root))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth);

    let max_body = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api/courses", course_routes)
        .nest("/api/lessons", lesson_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/admin", admin_routes)
        .merge(learner_routes)
        // Global Middleware (applied from outside in)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
