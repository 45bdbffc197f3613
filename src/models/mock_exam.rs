// src/models/mock_exam.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Exam family: 'ielts' or 'toeic'.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Ielts,
    Toeic,
}

impl TryFrom<String> for ExamType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "ielts" => Ok(ExamType::Ielts),
            "toeic" => Ok(ExamType::Toeic),
            other => Err(format!("unknown exam type '{}'", other)),
        }
    }
}

/// The skill a mock exam targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamSkill {
    Listening,
    Speaking,
    Reading,
    Writing,
}

impl ExamSkill {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamSkill::Listening => "listening",
            ExamSkill::Speaking => "speaking",
            ExamSkill::Reading => "reading",
            ExamSkill::Writing => "writing",
        }
    }
}

impl fmt::Display for ExamSkill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ExamSkill {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "listening" => Ok(ExamSkill::Listening),
            "speaking" => Ok(ExamSkill::Speaking),
            "reading" => Ok(ExamSkill::Reading),
            "writing" => Ok(ExamSkill::Writing),
            other => Err(format!("unknown exam skill '{}'", other)),
        }
    }
}

/// Represents the 'mock_exams' table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MockExam {
    pub id: i64,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub exam_type: ExamType,
    #[sqlx(try_from = "String")]
    pub skill: ExamSkill,
    pub description: String,

    /// Configured grading weights. Informational; scoring uses a flat average.
    pub auto_weight: f64,
    pub manual_weight: f64,

    /// BCP-47 tag used by the client-side speech recognizer (en-US, en-GB, en-AU).
    pub speech_language: String,
    pub created_at: DateTime<Utc>,
}

/// Represents the 'mock_questions' table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MockQuestion {
    pub id: i64,
    pub exam_id: i64,
    pub text: String,
    pub order: i32,
    pub media_file: Option<String>,

    /// Reference answer the client compares speech against.
    pub sample_answer: Option<String>,
}

/// Represents the 'mock_choices' table. Only auto-gradable questions have choices.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MockChoice {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// DTO for sending a mock question to the client (correct answers excluded).
#[derive(Debug, Serialize)]
pub struct PublicMockQuestion {
    pub id: i64,
    pub text: String,
    pub order: i32,
    pub media_file: Option<String>,
    pub sample_answer: Option<String>,
    pub choices: Vec<crate::models::course::PublicChoice>,
}

/// DTO for the exam-taking page.
#[derive(Debug, Serialize)]
pub struct MockExamResponse {
    pub exam: MockExam,
    pub questions: Vec<PublicMockQuestion>,
}
