// src/models/sent_email.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'sent_emails' table: a log of every reminder delivery attempt.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SentEmail {
    pub id: i64,
    pub to_email: String,
    pub subject: String,
    pub body: String,
    pub course_id: Option<i64>,
    pub sent_at: DateTime<Utc>,

    /// 'sent' or 'error: <kind>'.
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SentEmailListParams {
    pub limit: Option<i64>,
}
