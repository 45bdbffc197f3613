// src/models/course.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Represents the 'lessons' table. Lessons are ordered by `order` within a course.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,

    /// Optional short video reference.
    pub video: Option<String>,

    pub order: i32,
}

/// Represents the 'questions' table (lesson quiz questions).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub lesson_id: i64,
    pub question_text: String,
    pub order: i32,
}

/// Represents the 'choices' table.
/// Exactly one correct choice per question is expected but not enforced.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub choice_text: String,
    pub is_correct: bool,
}

/// Represents the 'lesson_progress' table. Unique per (user, lesson).
/// `score` is an integer percentage, unlike the float attempt score.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LessonProgress {
    pub id: i64,
    pub user_id: i64,
    pub lesson_id: i64,
    pub completed: bool,
    pub score: i32,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Choice as shown to learners (correctness hidden).
#[derive(Debug, Serialize)]
pub struct PublicChoice {
    pub id: i64,
    pub text: String,
}

/// DTO for a lesson question with its public choices.
#[derive(Debug, Serialize)]
pub struct LessonQuestion {
    pub id: i64,
    pub question_text: String,
    pub choices: Vec<PublicChoice>,
}

/// Compact per-lesson status used on course pages.
#[derive(Debug, Clone, Serialize)]
pub struct LessonStatus {
    pub completed: bool,
    pub score: i32,
}

/// DTO for the course page.
#[derive(Debug, Serialize)]
pub struct CourseDetailResponse {
    pub course: Course,
    pub is_enrolled: bool,
    pub lessons: Vec<Lesson>,
    /// Keyed by lesson id. Empty unless the user is enrolled.
    pub lesson_progress: HashMap<i64, LessonStatus>,
    pub total_duration_minutes: i64,
    pub progress_percent: i32,
    pub enrolled_count: i64,
}

/// DTO for the lesson page.
#[derive(Debug, Serialize)]
pub struct LessonDetailResponse {
    pub lesson: Lesson,
    pub questions: Vec<LessonQuestion>,
    pub progress: LessonProgress,
    pub lessons: Vec<Lesson>,
    pub lesson_progress: HashMap<i64, LessonStatus>,
}

/// DTO for submitting a lesson quiz.
#[derive(Debug, Deserialize)]
pub struct SubmitLessonRequest {
    /// User's answers map.
    /// Key: Question ID (as string)
    /// Value: selected Choice ID. Kept raw so one bad entry is skipped, not fatal.
    #[serde(default)]
    pub answers: HashMap<String, serde_json::Value>,
}

/// Result of grading a lesson quiz.
#[derive(Debug, Serialize)]
pub struct LessonResult {
    pub score: i32,
    pub correct_count: usize,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub course_id: i64,
    pub created: bool,
}
