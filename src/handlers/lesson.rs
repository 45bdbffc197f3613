// src/handlers/lesson.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::course::SubmitLessonRequest,
    services::{grading::parse_choice_answers, progress},
    utils::jwt::Claims,
};

/// Grades a lesson quiz and marks the lesson completed.
///
/// Unanswered questions, malformed entries and choices from other questions count as wrong.
pub async fn submit_lesson(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(lesson_id): Path<i64>,
    Json(req): Json<SubmitLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let answers = parse_choice_answers(req.answers);
    let result = progress::submit_lesson(&pool, user_id, lesson_id, &answers).await?;
    Ok(Json(result))
}

/// Resets the user's progress on a lesson so it can be retaken.
pub async fn retry_lesson(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(lesson_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    progress::retry_lesson(&pool, user_id, lesson_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
