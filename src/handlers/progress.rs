// src/handlers/progress.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::progress::{CourseProgressEntry, EligibilityResponse},
    services::progress::{certificates, completion, course_completion, last_completed_at},
    utils::jwt::Claims,
};

/// Completion of one course for the current user.
pub async fn get_course_progress(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let progress = course_completion(&pool, user_id, course_id).await?;
    Ok(Json(progress))
}

/// Progress across every enrolled course.
pub async fn progress_overview(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let rows: Vec<(i64, String, i64, i64)> = sqlx::query_as(
        r#"
        SELECT
            c.id,
            c.title,
            (SELECT COUNT(*) FROM lessons l WHERE l.course_id = c.id),
            (SELECT COUNT(*)
             FROM lesson_progress lp
             JOIN lessons l ON l.id = lp.lesson_id
             WHERE lp.user_id = $1 AND l.course_id = c.id AND lp.completed)
        FROM courses c
        JOIN enrollments e ON e.course_id = c.id AND e.user_id = $1
        ORDER BY e.enrolled_at, c.id
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load progress overview: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let overview: Vec<CourseProgressEntry> = rows
        .into_iter()
        .map(|(course_id, title, total, completed)| CourseProgressEntry {
            course_id,
            title,
            progress: completion(completed, total),
            url: config.course_url(course_id),
        })
        .collect();

    Ok(Json(overview))
}

/// Whether the current user may receive the course certificate.
pub async fn certificate_eligibility(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let progress = course_completion(&pool, user_id, course_id).await?;
    Ok(Json(EligibilityResponse {
        course_id,
        eligible: progress.is_finished(),
    }))
}

/// Certificates for all finished courses.
pub async fn list_certificates(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    Ok(Json(certificates(&pool, user_id).await?))
}

/// Certificate data for one course. Rejected until every lesson is completed.
pub async fn get_certificate(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let progress = course_completion(&pool, user_id, course_id).await?;
    if !progress.is_finished() {
        return Err(AppError::BadRequest(
            "Course not completed yet; certificate unavailable".to_string(),
        ));
    }

    let (title,): (String,) = sqlx::query_as("SELECT title FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_one(&pool)
        .await?;
    let completed_at = last_completed_at(&pool, user_id, course_id).await?;

    Ok(Json(json!({
        "course_id": course_id,
        "title": title,
        "user_id": user_id,
        "completed_at": completed_at,
    })))
}
