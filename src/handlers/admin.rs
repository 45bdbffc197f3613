// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        sent_email::{SentEmail, SentEmailListParams},
        submission::{
            GradeSubmissionRequest, GradeSubmissionResponse, PendingSubmission, Submission,
            SubmissionKind,
        },
    },
    services::{reconciler, reminders::ReminderEngine},
    state::AppState,
    utils::html::text_to_html,
};

/// Lists unreviewed submissions of one kind, oldest first.
/// Payloads are returned verbatim alongside an escaped HTML rendering.
/// Admin only.
pub async fn list_pending_submissions(
    State(pool): State<PgPool>,
    Path(kind): Path<SubmissionKind>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!(
        r#"
        SELECT id, user_id, question_id, {column} AS payload, reviewed, score, created_at
        FROM {table}
        WHERE NOT reviewed
        ORDER BY created_at, id
        "#,
        column = kind.payload_column(),
        table = kind.table(),
    );

    let submissions = sqlx::query_as::<_, Submission>(&sql)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list {:?} submissions: {:?}", kind, e);
            AppError::InternalServerError(e.to_string())
        })?;

    let pending: Vec<PendingSubmission> = submissions
        .into_iter()
        .map(|submission| PendingSubmission {
            payload_html: text_to_html(&submission.payload),
            submission,
        })
        .collect();

    Ok(Json(pending))
}

/// Records a manual grade, then reconciles it into the latest attempt.
/// Admin only. Reconciliation problems never fail the grading itself.
pub async fn grade_submission(
    State(pool): State<PgPool>,
    Path((kind, id)): Path<(SubmissionKind, i64)>,
    Json(payload): Json<GradeSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let sql = format!(
        r#"
        UPDATE {table} SET score = $1, reviewed = TRUE
        WHERE id = $2
        RETURNING id, user_id, question_id, {column} AS payload, reviewed, score, created_at
        "#,
        column = kind.payload_column(),
        table = kind.table(),
    );

    let submission = sqlx::query_as::<_, Submission>(&sql)
        .bind(payload.score)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))?;

    tracing::info!(
        "Graded {:?} submission {} of user {}: {}",
        kind,
        submission.id,
        submission.user_id,
        payload.score
    );

    reconciler::on_graded(&pool, kind, &submission).await;

    Ok(Json(GradeSubmissionResponse {
        id: submission.id,
        kind,
        score: payload.score,
        reviewed: submission.reviewed,
    }))
}

fn reminder_engine(state: &AppState) -> ReminderEngine {
    ReminderEngine::new(
        state.pool.clone(),
        state.config.clone(),
        state.notifier.clone(),
    )
}

/// Queues the study reminder job for all learners.
/// Admin only.
pub async fn trigger_reminders(State(state): State<AppState>) -> impl IntoResponse {
    let engine = reminder_engine(&state);
    tokio::spawn(async move {
        if let Err(e) = engine.send_study_reminders().await {
            tracing::error!("Study reminder job failed: {}", e);
        }
    });

    (StatusCode::ACCEPTED, Json(json!({ "status": "queued" })))
}

/// Queues reminders for learners of one course.
/// Admin only.
pub async fn trigger_course_reminders(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
) -> impl IntoResponse {
    let engine = reminder_engine(&state);
    tokio::spawn(async move {
        if let Err(e) = engine.send_course_reminders(course_id).await {
            tracing::error!("Course {} reminder job failed: {}", course_id, e);
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "queued", "course_id": course_id })),
    )
}

/// History of sent reminder emails, newest first.
/// Admin only.
pub async fn list_sent_emails(
    State(pool): State<PgPool>,
    Query(params): Query<SentEmailListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);

    let emails = sqlx::query_as::<_, SentEmail>(
        r#"
        SELECT id, to_email, subject, body, course_id, sent_at, status
        FROM sent_emails
        ORDER BY sent_at DESC, id DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(emails))
}
