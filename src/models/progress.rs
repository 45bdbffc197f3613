// src/models/progress.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Completion of one course for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CourseProgress {
    pub completed: i64,
    pub total: i64,
    pub percent: i32,
}

/// Entry of the progress overview (one per enrolled course).
#[derive(Debug, Serialize)]
pub struct CourseProgressEntry {
    pub course_id: i64,
    pub title: String,
    #[serde(flatten)]
    pub progress: CourseProgress,
    pub url: String,
}

/// A finished course the user can view a certificate for.
#[derive(Debug, Serialize)]
pub struct Certificate {
    pub course_id: i64,
    pub title: String,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub course_id: i64,
    pub eligible: bool,
}
