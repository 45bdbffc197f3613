// src/services/reminders.rs

use std::{collections::HashSet, sync::Arc, time::Duration};

use serde::Serialize;
use sqlx::PgPool;
use tokio::task::JoinHandle;

use crate::{
    config::Config,
    error::AppError,
    models::{course::Lesson, user::Recipient},
    services::{
        notify::{NotificationSender, deliver, record_delivery},
        progress::{completion, completed_lesson_ids, course_lessons, next_lesson},
    },
    utils::html::escape_text,
};

/// One unfinished course listed in a reminder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingCourse {
    pub course_id: i64,
    pub title: String,
    pub percent: i32,
    pub next_lesson: Option<String>,
    pub url: String,
}

/// Totals of one reminder run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    pub recipients: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Builds the reminder entry for a course, or `None` if it is empty or finished.
pub fn pending_course(
    course_id: i64,
    title: &str,
    lessons: &[Lesson],
    completed: &HashSet<i64>,
    url: String,
) -> Option<PendingCourse> {
    let total = lessons.len() as i64;
    let done = lessons.iter().filter(|l| completed.contains(&l.id)).count() as i64;
    let progress = completion(done, total);
    if total == 0 || progress.is_finished() {
        return None;
    }

    Some(PendingCourse {
        course_id,
        title: title.to_string(),
        percent: progress.percent,
        next_lesson: next_lesson(lessons, completed).map(|l| l.title.clone()),
        url,
    })
}

/// Renders the HTML body of a reminder. User-provided text is escaped.
pub fn render_reminder(username: &str, pending: &[PendingCourse]) -> String {
    let mut items = String::new();
    for course in pending {
        let next = match &course.next_lesson {
            Some(title) => format!(" Next lesson: <em>{}</em>.", escape_text(title)),
            None => String::new(),
        };
        items.push_str(&format!(
            "<li><a href=\"{}\">{}</a>: {}% complete.{}</li>",
            escape_text(&course.url),
            escape_text(&course.title),
            course.percent,
            next
        ));
    }

    format!(
        "<p>Hi {},</p><p>You still have lessons waiting for you:</p><ul>{}</ul><p>Keep going!</p>",
        escape_text(username),
        items
    )
}

pub const DAILY_SUBJECT: &str = "Study reminder: your course progress";

pub fn course_subject(title: &str) -> String {
    format!("Study reminder: {}", title)
}

/// Reads progress and mails learners who are behind. Never mutates grading state.
pub struct ReminderEngine {
    pool: PgPool,
    config: Config,
    notifier: Arc<dyn NotificationSender>,
}

impl ReminderEngine {
    pub fn new(pool: PgPool, config: Config, notifier: Arc<dyn NotificationSender>) -> Self {
        Self {
            pool,
            config,
            notifier,
        }
    }

    async fn pending_for(
        &self,
        user_id: i64,
        courses: &[(i64, String)],
    ) -> Result<Vec<PendingCourse>, AppError> {
        let mut pending = Vec::new();
        for (course_id, title) in courses {
            let lessons = course_lessons(&self.pool, *course_id).await?;
            let completed = completed_lesson_ids(&self.pool, user_id, *course_id).await?;
            if let Some(entry) = pending_course(
                *course_id,
                title,
                &lessons,
                &completed,
                self.config.course_url(*course_id),
            ) {
                pending.push(entry);
            }
        }
        Ok(pending)
    }

    /// Pending courses for one recipient, or `None` when there is nothing to send.
    /// A lookup failure skips only this recipient.
    async fn pending_or_skip(
        &self,
        user_id: i64,
        courses: &[(i64, String)],
    ) -> Option<Vec<PendingCourse>> {
        match self.pending_for(user_id, courses).await {
            Ok(pending) if !pending.is_empty() => Some(pending),
            Ok(_) => None,
            Err(e) => {
                tracing::error!("Skipping reminders for user {}: {}", user_id, e);
                None
            }
        }
    }

    async fn notify(
        &self,
        recipient: &Recipient,
        subject: &str,
        pending: &[PendingCourse],
        course_id: Option<i64>,
        report: &mut ReminderReport,
    ) {
        let body = render_reminder(&recipient.username, pending);
        let record = deliver(
            self.notifier.as_ref(),
            self.config.notify_timeout(),
            &recipient.email,
            subject,
            &body,
            course_id,
        )
        .await;

        if record.is_sent() {
            report.sent += 1;
        } else {
            report.failed += 1;
        }
        record_delivery(&self.pool, &record).await;
    }

    /// Daily job: one mail per user listing every unfinished enrolled course.
    pub async fn send_study_reminders(&self) -> Result<ReminderReport, AppError> {
        let recipients: Vec<Recipient> = sqlx::query_as(
            r#"
            SELECT DISTINCT u.id, u.username, u.email
            FROM users u
            JOIN enrollments e ON e.user_id = u.id
            WHERE u.email <> ''
            ORDER BY u.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut report = ReminderReport::default();
        for recipient in &recipients {
            let courses: Vec<(i64, String)> = sqlx::query_as(
                r#"
                SELECT c.id, c.title
                FROM courses c
                JOIN enrollments e ON e.course_id = c.id
                WHERE e.user_id = $1
                ORDER BY c.id
                "#,
            )
            .bind(recipient.id)
            .fetch_all(&self.pool)
            .await?;

            let Some(pending) = self.pending_or_skip(recipient.id, &courses).await else {
                continue;
            };

            report.recipients += 1;
            self.notify(recipient, DAILY_SUBJECT, &pending, None, &mut report)
                .await;
        }

        tracing::info!(
            "Study reminders: {} recipient(s), {} sent, {} failed",
            report.recipients,
            report.sent,
            report.failed
        );
        Ok(report)
    }

    /// On-demand job for one course. An unknown course is a logged no-op.
    pub async fn send_course_reminders(&self, course_id: i64) -> Result<ReminderReport, AppError> {
        let course: Option<(i64, String)> =
            sqlx::query_as("SELECT id, title FROM courses WHERE id = $1")
                .bind(course_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(course) = course else {
            tracing::warn!("Course reminders requested for unknown course {}", course_id);
            return Ok(ReminderReport::default());
        };

        let recipients: Vec<Recipient> = sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.email
            FROM users u
            JOIN enrollments e ON e.user_id = u.id
            WHERE e.course_id = $1 AND u.email <> ''
            ORDER BY u.id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let subject = course_subject(&course.1);
        let courses = [course];
        let mut report = ReminderReport::default();
        for recipient in &recipients {
            let Some(pending) = self.pending_or_skip(recipient.id, &courses).await else {
                continue;
            };
            report.recipients += 1;
            self.notify(recipient, &subject, &pending, Some(course_id), &mut report)
                .await;
        }

        tracing::info!(
            "Course {} reminders: {} recipient(s), {} sent, {} failed",
            course_id,
            report.recipients,
            report.sent,
            report.failed
        );
        Ok(report)
    }
}

/// Runs the daily job every `period`, starting one period from now.
pub fn spawn_daily(engine: Arc<ReminderEngine>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            if let Err(e) = engine.send_study_reminders().await {
                tracing::error!("Scheduled study reminders failed: {}", e);
            }
        }
    })
}
