// src/services/progress.rs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        course::{Lesson, LessonProgress, LessonResult, LessonStatus},
        progress::{Certificate, CourseProgress},
    },
    services::grading::{AnswerKey, grade_choices},
};

/// Completion maths. `percent` is floored; an empty course is 0%.
pub fn completion(completed: i64, total: i64) -> CourseProgress {
    let percent = if total > 0 {
        (completed.clamp(0, total) * 100 / total) as i32
    } else {
        0
    };
    CourseProgress {
        completed,
        total,
        percent,
    }
}

impl CourseProgress {
    /// A course is finished once every lesson is completed and it has at least one.
    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }
}

/// First lesson (by `order`) that is not completed yet.
pub fn next_lesson<'a>(lessons: &'a [Lesson], completed: &HashSet<i64>) -> Option<&'a Lesson> {
    lessons.iter().find(|l| !completed.contains(&l.id))
}

pub async fn fetch_lesson(pool: &PgPool, lesson_id: i64) -> Result<Lesson, AppError> {
    sqlx::query_as::<_, Lesson>(
        r#"SELECT id, course_id, title, description, video, "order" FROM lessons WHERE id = $1"#,
    )
    .bind(lesson_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Lesson {} not found", lesson_id)))
}

pub async fn course_lessons(pool: &PgPool, course_id: i64) -> Result<Vec<Lesson>, AppError> {
    let lessons = sqlx::query_as::<_, Lesson>(
        r#"
        SELECT id, course_id, title, description, video, "order"
        FROM lessons
        WHERE course_id = $1
        ORDER BY "order", id
        "#,
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;
    Ok(lessons)
}

/// Ids of the lessons in a course the user has completed.
pub async fn completed_lesson_ids(
    pool: &PgPool,
    user_id: i64,
    course_id: i64,
) -> Result<HashSet<i64>, AppError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT lp.lesson_id
        FROM lesson_progress lp
        JOIN lessons l ON l.id = lp.lesson_id
        WHERE lp.user_id = $1 AND l.course_id = $2 AND lp.completed
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Per-lesson status for every lesson of the course the user has touched.
pub async fn lesson_statuses(
    pool: &PgPool,
    user_id: i64,
    course_id: i64,
) -> Result<HashMap<i64, LessonStatus>, AppError> {
    let rows: Vec<(i64, bool, i32)> = sqlx::query_as(
        r#"
        SELECT lp.lesson_id, lp.completed, lp.score
        FROM lesson_progress lp
        JOIN lessons l ON l.id = lp.lesson_id
        WHERE lp.user_id = $1 AND l.course_id = $2
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(lesson_id, completed, score)| (lesson_id, LessonStatus { completed, score }))
        .collect())
}

/// Completion of one course for one user. Unknown courses are a `NotFound`.
pub async fn course_completion(
    pool: &PgPool,
    user_id: i64,
    course_id: i64,
) -> Result<CourseProgress, AppError> {
    let (exists, total, completed): (bool, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            EXISTS (SELECT 1 FROM courses WHERE id = $2),
            (SELECT COUNT(*) FROM lessons WHERE course_id = $2),
            (SELECT COUNT(*)
             FROM lesson_progress lp
             JOIN lessons l ON l.id = lp.lesson_id
             WHERE lp.user_id = $1 AND l.course_id = $2 AND lp.completed)
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(pool)
    .await?;

    if !exists {
        return Err(AppError::NotFound(format!("Course {} not found", course_id)));
    }
    Ok(completion(completed, total))
}

/// Latest lesson completion time in a course, used as the certificate date.
pub async fn last_completed_at(
    pool: &PgPool,
    user_id: i64,
    course_id: i64,
) -> Result<Option<DateTime<Utc>>, AppError> {
    let (at,): (Option<DateTime<Utc>>,) = sqlx::query_as(
        r#"
        SELECT MAX(lp.completed_at)
        FROM lesson_progress lp
        JOIN lessons l ON l.id = lp.lesson_id
        WHERE lp.user_id = $1 AND l.course_id = $2 AND lp.completed
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(pool)
    .await?;
    Ok(at)
}

/// Certificates for every enrolled course the user has finished.
pub async fn certificates(pool: &PgPool, user_id: i64) -> Result<Vec<Certificate>, AppError> {
    let rows: Vec<(i64, String, i64, i64, Option<DateTime<Utc>>)> = sqlx::query_as(
        r#"
        SELECT
            c.id,
            c.title,
            (SELECT COUNT(*) FROM lessons l WHERE l.course_id = c.id) AS total,
            (SELECT COUNT(*)
             FROM lesson_progress lp
             JOIN lessons l ON l.id = lp.lesson_id
             WHERE lp.user_id = $1 AND l.course_id = c.id AND lp.completed) AS completed,
            (SELECT MAX(lp.completed_at)
             FROM lesson_progress lp
             JOIN lessons l ON l.id = lp.lesson_id
             WHERE lp.user_id = $1 AND l.course_id = c.id AND lp.completed) AS completed_at
        FROM courses c
        JOIN enrollments e ON e.course_id = c.id AND e.user_id = $1
        ORDER BY c.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter(|(_, _, total, completed, _)| completion(*completed, *total).is_finished())
        .map(|(course_id, title, _, _, completed_at)| Certificate {
            course_id,
            title,
            completed_at,
        })
        .collect())
}

/// Atomic get-or-create of the (user, lesson) progress row.
pub async fn ensure_progress(
    pool: &PgPool,
    user_id: i64,
    lesson_id: i64,
) -> Result<LessonProgress, AppError> {
    // The no-op update makes RETURNING yield the existing row on conflict.
    let progress = sqlx::query_as::<_, LessonProgress>(
        r#"
        INSERT INTO lesson_progress (user_id, lesson_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, lesson_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING id, user_id, lesson_id, completed, score, completed_at
        "#,
    )
    .bind(user_id)
    .bind(lesson_id)
    .fetch_one(pool)
    .await?;
    Ok(progress)
}

/// Grades a lesson quiz and marks the lesson completed.
pub async fn submit_lesson(
    pool: &PgPool,
    user_id: i64,
    lesson_id: i64,
    answers: &HashMap<i64, i64>,
) -> Result<LessonResult, AppError> {
    let lesson = fetch_lesson(pool, lesson_id).await?;

    // Every question counts, including ones without choices.
    let rows: Vec<(i64, Option<i64>, Option<bool>)> = sqlx::query_as(
        r#"
        SELECT q.id, c.id, c.is_correct
        FROM questions q
        LEFT JOIN choices c ON c.question_id = q.id
        WHERE q.lesson_id = $1
        ORDER BY q."order", q.id, c.id
        "#,
    )
    .bind(lesson.id)
    .fetch_all(pool)
    .await?;

    let mut key = AnswerKey::new();
    for (question_id, choice_id, is_correct) in rows {
        match choice_id {
            Some(choice_id) => key.add_choice(question_id, choice_id, is_correct.unwrap_or(false)),
            None => key.add_question(question_id),
        }
    }

    let tally = grade_choices(&key, answers);
    let score = tally.whole_percent();

    sqlx::query(
        r#"
        INSERT INTO lesson_progress (user_id, lesson_id, completed, score, completed_at)
        VALUES ($1, $2, TRUE, $3, NOW())
        ON CONFLICT (user_id, lesson_id) DO UPDATE SET
            completed = TRUE,
            score = EXCLUDED.score,
            completed_at = EXCLUDED.completed_at
        "#,
    )
    .bind(user_id)
    .bind(lesson.id)
    .bind(score)
    .execute(pool)
    .await?;

    tracing::info!(
        "User {} completed lesson {} with {}/{} ({}%)",
        user_id,
        lesson.id,
        tally.correct,
        tally.total,
        score
    );

    Ok(LessonResult {
        score,
        correct_count: tally.correct,
        total_count: tally.total,
    })
}

/// Resets a lesson so it can be retaken. Idempotent; a missing row is left missing.
pub async fn retry_lesson(pool: &PgPool, user_id: i64, lesson_id: i64) -> Result<(), AppError> {
    let lesson = fetch_lesson(pool, lesson_id).await?;

    let result = sqlx::query(
        r#"
        UPDATE lesson_progress
        SET completed = FALSE, score = 0, completed_at = NULL
        WHERE user_id = $1 AND lesson_id = $2
        "#,
    )
    .bind(user_id)
    .bind(lesson.id)
    .execute(pool)
    .await?;

    tracing::debug!(
        "User {} reset lesson {} ({} row(s))",
        user_id,
        lesson.id,
        result.rows_affected()
    );
    Ok(())
}
