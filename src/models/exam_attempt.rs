// src/models/exam_attempt.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::mock_exam::{ExamSkill, ExamType};

/// Represents the 'exam_attempts' table.
/// One row per exam submission; manual grading later mutates the score in place.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamAttempt {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub score: f64,
    pub max_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Attempt joined with its exam, for the scores page.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptSummary {
    pub id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    #[sqlx(try_from = "String")]
    pub exam_type: ExamType,
    #[sqlx(try_from = "String")]
    pub skill: ExamSkill,
    pub score: f64,
    pub max_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Answer submitted for one mock question.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPayload {
    /// Selected choice id for an auto-gradable question.
    Choice(i64),

    /// Recorded speech as a base64 data URI, plus the client's provisional score.
    Speaking {
        #[serde(default)]
        audio: Option<String>,
        #[serde(default)]
        score: Option<f64>,
    },

    /// Free text for manual review.
    Writing(String),
}

/// DTO for submitting a mock exam.
///
/// Entries are kept as raw JSON so that one malformed answer
/// is skipped instead of rejecting the whole submission.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    /// Key: Mock question id (as string). Value: an `AnswerPayload`.
    #[serde(default)]
    pub answers: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct SubmitExamResponse {
    pub attempt_id: i64,
    pub score: f64,
    pub max_score: f64,
}
