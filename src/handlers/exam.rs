// src/handlers/exam.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        course::PublicChoice,
        exam_attempt::{AttemptSummary, SubmitExamRequest},
        mock_exam::{MockChoice, MockExam, MockExamResponse, MockQuestion, PublicMockQuestion},
    },
    services::attempts,
    state::AppState,
    utils::jwt::Claims,
};

/// Lists mock exams grouped by type and skill.
pub async fn list_exams(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, MockExam>(
        r#"
        SELECT id, title, exam_type, skill, description,
               auto_weight, manual_weight, speech_language, created_at
        FROM mock_exams
        ORDER BY exam_type, skill, title
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list mock exams: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(exams))
}

/// Exam paper with public choices (correct answers hidden).
pub async fn get_exam(
    State(pool): State<PgPool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = attempts::fetch_exam(&pool, exam_id).await?;

    let questions = sqlx::query_as::<_, MockQuestion>(
        r#"
        SELECT id, exam_id, text, "order", media_file, sample_answer
        FROM mock_questions
        WHERE exam_id = $1
        ORDER BY "order", id
        "#,
    )
    .bind(exam.id)
    .fetch_all(&pool)
    .await?;

    let choices = sqlx::query_as::<_, MockChoice>(
        r#"
        SELECT c.id, c.question_id, c.text, c.is_correct
        FROM mock_choices c
        JOIN mock_questions q ON q.id = c.question_id
        WHERE q.exam_id = $1
        ORDER BY c.id
        "#,
    )
    .bind(exam.id)
    .fetch_all(&pool)
    .await?;

    let mut by_question: HashMap<i64, Vec<PublicChoice>> = HashMap::new();
    for choice in choices {
        by_question
            .entry(choice.question_id)
            .or_default()
            .push(PublicChoice {
                id: choice.id,
                text: choice.text,
            });
    }

    let questions = questions
        .into_iter()
        .map(|q| PublicMockQuestion {
            choices: by_question.remove(&q.id).unwrap_or_default(),
            id: q.id,
            text: q.text,
            order: q.order,
            media_file: q.media_file,
            sample_answer: q.sample_answer,
        })
        .collect();

    Ok(Json(MockExamResponse { exam, questions }))
}

/// Submits a mock exam and records one attempt.
///
/// * Multiple-choice answers are graded immediately.
/// * Speaking audio and writing text are queued for manual review.
/// * Rejects exams without questions before anything is stored.
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let result = attempts::submit_exam(
        &state.pool,
        state.store.as_ref(),
        user_id,
        exam_id,
        req.answers,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// The current user's attempts, newest first.
pub async fn list_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempts = sqlx::query_as::<_, AttemptSummary>(
        r#"
        SELECT
            a.id, a.exam_id,
            e.title AS exam_title, e.exam_type, e.skill,
            a.score, a.max_score, a.created_at
        FROM exam_attempts a
        JOIN mock_exams e ON e.id = a.exam_id
        WHERE a.user_id = $1
        ORDER BY a.created_at DESC, a.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(attempts))
}
