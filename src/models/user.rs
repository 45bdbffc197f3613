// src/models/user.rs

use serde::Serialize;
use sqlx::FromRow;

/// Minimal mirror of an identity-provider user: what reminders need to reach them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Recipient {
    pub id: i64,
    pub username: String,
    pub email: String,
}
