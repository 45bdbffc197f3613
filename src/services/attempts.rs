// src/services/attempts.rs

use std::collections::HashMap;

use sqlx::PgPool;

use crate::{
    config::MAX_SCORE,
    error::AppError,
    models::{
        exam_attempt::SubmitExamResponse,
        mock_exam::{MockChoice, MockExam},
    },
    services::{
        grading::AnswerKey,
        intake,
        scoring::{ExamSheet, IntakeItem, ScoringPlan, parse_answers, plan_attempt},
        storage::SubmissionStore,
    },
};

pub async fn fetch_exam(pool: &PgPool, exam_id: i64) -> Result<MockExam, AppError> {
    sqlx::query_as::<_, MockExam>(
        r#"
        SELECT id, title, exam_type, skill, description,
               auto_weight, manual_weight, speech_language, created_at
        FROM mock_exams
        WHERE id = $1
        "#,
    )
    .bind(exam_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Exam {} not found", exam_id)))
}

/// Loads the exam's questions and answer key.
async fn load_sheet(pool: &PgPool, exam: &MockExam) -> Result<ExamSheet, AppError> {
    let questions: Vec<(i64,)> = sqlx::query_as(
        r#"SELECT id FROM mock_questions WHERE exam_id = $1 ORDER BY "order", id"#,
    )
    .bind(exam.id)
    .fetch_all(pool)
    .await?;

    let choices: Vec<MockChoice> = sqlx::query_as(
        r#"
        SELECT c.id, c.question_id, c.text, c.is_correct
        FROM mock_choices c
        JOIN mock_questions q ON q.id = c.question_id
        WHERE q.exam_id = $1
        ORDER BY q."order", q.id, c.id
        "#,
    )
    .bind(exam.id)
    .fetch_all(pool)
    .await?;

    Ok(ExamSheet {
        skill: exam.skill,
        questions: questions.into_iter().map(|(id,)| id).collect(),
        key: AnswerKey::from_rows(choices.into_iter().map(|c| (c.question_id, c.id, c.is_correct))),
    })
}

/// Audio already saved to the store, waiting for its submission row.
struct StagedAudio {
    question_id: i64,
    reference: String,
    score: Option<f64>,
}

/// Grades one exam submission end to end and records exactly one attempt.
///
/// * Rejects exams without questions before anything is written.
/// * Malformed answers are skipped one by one.
/// * Speaking and writing answers are queued for manual review.
/// * Audio is saved before the transaction and removed again if it rolls back.
pub async fn submit_exam(
    pool: &PgPool,
    store: &dyn SubmissionStore,
    user_id: i64,
    exam_id: i64,
    raw_answers: HashMap<String, serde_json::Value>,
) -> Result<SubmitExamResponse, AppError> {
    let exam = fetch_exam(pool, exam_id).await?;
    let sheet = load_sheet(pool, &exam).await?;

    if sheet.questions.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Exam '{}' has no questions",
            exam.title
        )));
    }

    let answers = parse_answers(raw_answers);
    let plan = plan_attempt(&sheet, &answers);

    let mut staged = Vec::new();
    for item in &plan.intake {
        if let IntakeItem::Speaking {
            question_id,
            audio,
            score,
        } = item
        {
            if let Some(reference) =
                intake::store_speaking(store, user_id, *question_id, audio).await
            {
                staged.push(StagedAudio {
                    question_id: *question_id,
                    reference,
                    score: *score,
                });
            }
        }
    }

    let (attempt_id, queued) = match record_attempt(pool, user_id, exam.id, &plan, &staged).await
    {
        Ok(recorded) => recorded,
        Err(e) => {
            let references: Vec<String> = staged.into_iter().map(|a| a.reference).collect();
            intake::discard_stored(store, &references).await;
            return Err(e);
        }
    };

    tracing::info!(
        "User {} submitted exam {}: attempt {} scored {} (auto {}/{}, {} speaking scores, {} queued for review)",
        user_id,
        exam.id,
        attempt_id,
        plan.final_score,
        plan.auto.correct,
        plan.auto.total,
        plan.speaking_scores.len(),
        queued
    );

    Ok(SubmitExamResponse {
        attempt_id,
        score: plan.final_score,
        max_score: MAX_SCORE,
    })
}

/// Writes review rows and the attempt in one transaction.
/// Returns the attempt id and how many submissions were queued.
async fn record_attempt(
    pool: &PgPool,
    user_id: i64,
    exam_id: i64,
    plan: &ScoringPlan,
    staged: &[StagedAudio],
) -> Result<(i64, usize), AppError> {
    let mut tx = pool.begin().await?;

    for audio in staged {
        intake::insert_speaking(
            &mut *tx,
            user_id,
            audio.question_id,
            &audio.reference,
            audio.score,
        )
        .await?;
    }

    let mut queued = staged.len();
    for item in &plan.intake {
        if let IntakeItem::Writing { question_id, text } = item {
            intake::submit_writing(&mut *tx, user_id, *question_id, text).await?;
            queued += 1;
        }
    }

    let (attempt_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO exam_attempts (user_id, exam_id, score, max_score)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(exam_id)
    .bind(plan.final_score)
    .bind(MAX_SCORE)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((attempt_id, queued))
}
