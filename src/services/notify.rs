// src/services/notify.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;

use crate::{config::Config, error::AppError};

/// Outbound mail boundary.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), AppError>;
}

/// Logs messages instead of sending them. Used when no mail API is configured.
#[derive(Debug, Clone)]
pub struct ConsoleMailer {
    from: String,
}

impl ConsoleMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl NotificationSender for ConsoleMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), AppError> {
        tracing::info!(
            "[mail] from={} to={} subject={:?} ({} bytes)",
            self.from,
            to,
            subject,
            html_body.len()
        );
        Ok(())
    }
}

/// Posts messages to a transactional mail HTTP API.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
            from: from.into(),
        })
    }
}

#[async_trait]
impl NotificationSender for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), AppError> {
        let mut request = self.client.post(&self.endpoint).json(&json!({
            "from": self.from,
            "to": [to],
            "subject": subject,
            "html": html_body,
        }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "mail API returned {}: {}",
                status, detail
            )));
        }
        Ok(())
    }
}

/// Picks the sender from configuration.
pub fn sender_from_config(config: &Config) -> Result<Arc<dyn NotificationSender>, AppError> {
    match &config.mail_api_url {
        Some(endpoint) => Ok(Arc::new(HttpMailer::new(
            endpoint.clone(),
            config.mail_api_token.clone(),
            config.default_from_email.clone(),
            config.notify_timeout(),
        )?)),
        None => Ok(Arc::new(ConsoleMailer::new(config.default_from_email.clone()))),
    }
}

/// What gets written to `sent_emails` after a delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRecord {
    pub to_email: String,
    pub subject: String,
    pub body: String,
    pub course_id: Option<i64>,
    pub status: String,
}

impl DeliveryRecord {
    pub fn is_sent(&self) -> bool {
        self.status == "sent"
    }
}

const ERROR_BODY_LIMIT: usize = 200;
const STATUS_LIMIT: usize = 50;

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Sends one message under a timeout and describes the outcome. Never fails.
pub async fn deliver(
    sender: &dyn NotificationSender,
    timeout: Duration,
    to: &str,
    subject: &str,
    html_body: &str,
    course_id: Option<i64>,
) -> DeliveryRecord {
    let outcome = match tokio::time::timeout(timeout, sender.send(to, subject, html_body)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Upstream(format!(
            "mail delivery timed out after {:?}",
            timeout
        ))),
    };

    match outcome {
        Ok(()) => DeliveryRecord {
            to_email: to.to_string(),
            subject: subject.to_string(),
            body: html_body.to_string(),
            course_id,
            status: "sent".to_string(),
        },
        Err(e) => {
            tracing::error!("Failed to send '{}' to {}: {}", subject, to, e);
            DeliveryRecord {
                to_email: to.to_string(),
                subject: subject.to_string(),
                body: truncate_chars(&e.to_string(), ERROR_BODY_LIMIT),
                course_id,
                status: truncate_chars(&format!("error: {}", e.kind()), STATUS_LIMIT),
            }
        }
    }
}

/// Persists a delivery record. Failures are logged only.
pub async fn record_delivery(pool: &PgPool, record: &DeliveryRecord) {
    let result = sqlx::query(
        r#"
        INSERT INTO sent_emails (to_email, subject, body, course_id, status)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&record.to_email)
    .bind(&record.subject)
    .bind(&record.body)
    .bind(record.course_id)
    .bind(&record.status)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::error!(
            "Failed to record sent email for {}: {:?}",
            record.to_email,
            e
        );
    }
}
