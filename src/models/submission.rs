// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::mock_exam::ExamSkill;

/// Which manual-review queue a submission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Speaking,
    Writing,
}

impl SubmissionKind {
    pub fn table(&self) -> &'static str {
        match self {
            SubmissionKind::Speaking => "speaking_submissions",
            SubmissionKind::Writing => "writing_submissions",
        }
    }

    /// Column holding the payload (audio reference or text).
    pub fn payload_column(&self) -> &'static str {
        match self {
            SubmissionKind::Speaking => "audio",
            SubmissionKind::Writing => "text",
        }
    }

    /// The single-skill exam whose score a graded submission of this kind overwrites.
    pub fn skill(&self) -> ExamSkill {
        match self {
            SubmissionKind::Speaking => ExamSkill::Speaking,
            SubmissionKind::Writing => ExamSkill::Writing,
        }
    }
}

/// A row of either submission table.
/// `payload` is the stored audio reference for speaking and the text for writing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Submission {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub payload: String,
    pub reviewed: bool,
    pub score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Review-queue entry: the stored payload plus an HTML-safe rendering of it.
#[derive(Debug, Serialize)]
pub struct PendingSubmission {
    #[serde(flatten)]
    pub submission: Submission,
    pub payload_html: String,
}

/// DTO for a manual grade.
#[derive(Debug, Deserialize, Validate)]
pub struct GradeSubmissionRequest {
    #[validate(range(min = 0.0, max = 100.0, message = "Score must be between 0 and 100."))]
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct GradeSubmissionResponse {
    pub id: i64,
    pub kind: SubmissionKind,
    pub score: f64,
    pub reviewed: bool,
}
