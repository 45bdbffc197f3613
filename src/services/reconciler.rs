// src/services/reconciler.rs

use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        exam_attempt::ExamAttempt,
        mock_exam::ExamSkill,
        submission::{Submission, SubmissionKind},
    },
};

/// Merges a manual grade into an attempt score.
///
/// On a single-skill exam matching the submission's modality the manual grade
/// replaces the score. On any other exam the displayed score never goes down.
pub fn merge_score(skill: ExamSkill, kind: SubmissionKind, current: f64, manual: f64) -> f64 {
    if skill == kind.skill() {
        manual
    } else {
        let current = if current.is_finite() { current } else { 0.0 };
        current.max(manual)
    }
}

/// Applies a graded submission to the user's most recent attempt at the exam.
///
/// Returns the updated attempt, or `None` when there was nothing to reconcile
/// (ungraded submission, or no attempt on record).
pub async fn reconcile(
    pool: &PgPool,
    kind: SubmissionKind,
    submission: &Submission,
) -> Result<Option<ExamAttempt>, AppError> {
    let Some(manual) = submission.score else {
        return Ok(None);
    };

    let mut tx = pool.begin().await?;

    let exam: Option<(i64, String)> = sqlx::query_as(
        r#"
        SELECT e.id, e.skill
        FROM mock_questions q
        JOIN mock_exams e ON e.id = q.exam_id
        WHERE q.id = $1
        "#,
    )
    .bind(submission.question_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (exam_id, skill) = exam.ok_or_else(|| {
        AppError::NotFound(format!("Question {} has no exam", submission.question_id))
    })?;
    let skill = ExamSkill::try_from(skill).map_err(AppError::InternalServerError)?;

    // Lock the latest attempt so concurrent gradings apply one after another.
    let attempt: Option<ExamAttempt> = sqlx::query_as(
        r#"
        SELECT id, user_id, exam_id, score, max_score, created_at
        FROM exam_attempts
        WHERE user_id = $1 AND exam_id = $2
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(submission.user_id)
    .bind(exam_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(attempt) = attempt else {
        tracing::debug!(
            "No attempt to reconcile for user {} on exam {}",
            submission.user_id,
            exam_id
        );
        return Ok(None);
    };

    let merged = merge_score(skill, kind, attempt.score, manual);

    let updated: ExamAttempt = sqlx::query_as(
        r#"
        UPDATE exam_attempts SET score = $1
        WHERE id = $2
        RETURNING id, user_id, exam_id, score, max_score, created_at
        "#,
    )
    .bind(merged)
    .bind(attempt.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Reconciled attempt {} ({} exam): {} -> {}",
        updated.id,
        skill,
        attempt.score,
        updated.score
    );
    Ok(Some(updated))
}

/// Reacts to a grading write. Failures are logged and never reach the grader.
pub async fn on_graded(pool: &PgPool, kind: SubmissionKind, submission: &Submission) {
    if let Err(e) = reconcile(pool, kind, submission).await {
        tracing::error!(
            "Failed to reconcile {:?} submission {}: {}",
            kind,
            submission.id,
            e
        );
    }
}
