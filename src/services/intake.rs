// src/services/intake.rs

use base64::{Engine as _, engine::general_purpose};
use sqlx::PgConnection;

use crate::{error::AppError, services::storage::SubmissionStore};

/// Audio decoded from a `data:audio/...;base64,` URI.
#[derive(Debug, PartialEq, Eq)]
pub struct DecodedAudio {
    pub bytes: Vec<u8>,
    /// Either "webm" or "mp3".
    pub extension: &'static str,
}

/// Decodes a recorder data URI such as `data:audio/webm;codecs=opus;base64,GkXf...`.
pub fn decode_audio_data_uri(data_uri: &str) -> Result<DecodedAudio, AppError> {
    let (header, encoded) = data_uri
        .split_once(',')
        .ok_or_else(|| AppError::BadRequest("Audio payload is not a data URI".to_string()))?;

    let meta = header
        .strip_prefix("data:")
        .and_then(|m| m.strip_suffix(";base64"))
        .ok_or_else(|| AppError::BadRequest("Audio payload must be a base64 data URI".to_string()))?;

    let mime = meta.split(';').next().unwrap_or_default().to_ascii_lowercase();
    if !mime.starts_with("audio/") {
        return Err(AppError::BadRequest(format!(
            "Unsupported media type '{}'",
            mime
        )));
    }

    let extension = if mime.contains("mpeg") || mime.contains("mp3") {
        "mp3"
    } else {
        "webm"
    };

    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid base64 audio: {}", e)))?;

    if bytes.is_empty() {
        return Err(AppError::BadRequest("Audio payload is empty".to_string()));
    }

    Ok(DecodedAudio { bytes, extension })
}

pub fn speaking_file_name(user_id: i64, question_id: i64, extension: &str) -> String {
    let tag = uuid::Uuid::new_v4().simple().to_string();
    format!("speaking_{}_{}_{}.{}", user_id, question_id, &tag[..8], extension)
}

/// Decodes and saves recorded audio ahead of the database write.
///
/// Malformed audio and storage failures are logged and yield `None` so the
/// rest of the exam is still graded.
pub async fn store_speaking(
    store: &dyn SubmissionStore,
    user_id: i64,
    question_id: i64,
    data_uri: &str,
) -> Option<String> {
    let stored = match decode_audio_data_uri(data_uri) {
        Ok(audio) => {
            let name = speaking_file_name(user_id, question_id, audio.extension);
            store.save(&audio.bytes, &name).await
        }
        Err(e) => Err(e),
    };

    match stored {
        Ok(reference) => Some(reference),
        Err(e) => {
            tracing::warn!(
                "Dropping speaking submission of user {} for question {}: {}",
                user_id,
                question_id,
                e
            );
            None
        }
    }
}

/// Removes audio saved for a submission that was never committed.
pub async fn discard_stored(store: &dyn SubmissionStore, references: &[String]) {
    for reference in references {
        if let Err(e) = store.remove(reference).await {
            tracing::error!("Failed to remove orphaned audio '{}': {}", reference, e);
        }
    }
}

/// Queues saved audio for review.
pub async fn insert_speaking(
    conn: &mut PgConnection,
    user_id: i64,
    question_id: i64,
    reference: &str,
    client_score: Option<f64>,
) -> Result<i64, AppError> {
    // A client-computed score is provisional: the row stays unreviewed.
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO speaking_submissions (user_id, question_id, audio, reviewed, score)
        VALUES ($1, $2, $3, FALSE, $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(question_id)
    .bind(reference)
    .bind(client_score)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Stores a writing answer for review, exactly as submitted.
pub async fn submit_writing(
    conn: &mut PgConnection,
    user_id: i64,
    question_id: i64,
    text: &str,
) -> Result<i64, AppError> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO writing_submissions (user_id, question_id, text, reviewed)
        VALUES ($1, $2, $3, FALSE)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(question_id)
    .bind(text)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}
