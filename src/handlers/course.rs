// src/handlers/course.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    config::MINUTES_PER_LESSON,
    error::AppError,
    models::course::{
        Choice, Course, CourseDetailResponse, EnrollResponse, LessonDetailResponse,
        LessonQuestion, PublicChoice, Question,
    },
    services::progress::{
        completion, course_lessons, ensure_progress, fetch_lesson, lesson_statuses,
    },
    utils::jwt::Claims,
};

async fn fetch_course(pool: &PgPool, course_id: i64) -> Result<Course, AppError> {
    sqlx::query_as::<_, Course>(
        "SELECT id, title, description, created_at FROM courses WHERE id = $1",
    )
    .bind(course_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Course {} not found", course_id)))
}

async fn is_enrolled(pool: &PgPool, user_id: i64, course_id: i64) -> Result<bool, AppError> {
    let (enrolled,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM enrollments WHERE user_id = $1 AND course_id = $2)",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(pool)
    .await?;
    Ok(enrolled)
}

/// Lists all courses.
pub async fn list_courses(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, Course>(
        "SELECT id, title, description, created_at FROM courses ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list courses: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(courses))
}

/// Lists the courses the current user is enrolled in.
pub async fn my_courses(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let courses = sqlx::query_as::<_, Course>(
        r#"
        SELECT c.id, c.title, c.description, c.created_at
        FROM courses c
        JOIN enrollments e ON e.course_id = c.id
        WHERE e.user_id = $1
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(courses))
}

/// Course page: lessons in order, the user's progress on each, and totals.
pub async fn get_course(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let course = fetch_course(&pool, course_id).await?;
    let lessons = course_lessons(&pool, course.id).await?;
    let enrolled = is_enrolled(&pool, user_id, course.id).await?;

    let lesson_progress = if enrolled {
        lesson_statuses(&pool, user_id, course.id).await?
    } else {
        HashMap::new()
    };

    let completed = lesson_progress.values().filter(|s| s.completed).count() as i64;
    let progress = completion(completed, lessons.len() as i64);

    let (enrolled_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
            .bind(course.id)
            .fetch_one(&pool)
            .await?;

    Ok(Json(CourseDetailResponse {
        total_duration_minutes: lessons.len() as i64 * MINUTES_PER_LESSON,
        progress_percent: progress.percent,
        course,
        is_enrolled: enrolled,
        lessons,
        lesson_progress,
        enrolled_count,
    }))
}

/// Enrolls the current user. Repeating the call is harmless.
pub async fn enroll(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let course = fetch_course(&pool, course_id).await?;

    // Atomic insert-if-absent on the (user_id, course_id) unique key.
    let inserted: Option<(i64,)> = sqlx::query_as(
        r#"
        INSERT INTO enrollments (user_id, course_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, course_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(course.id)
    .fetch_optional(&pool)
    .await?;

    let created = inserted.is_some();
    if created {
        tracing::info!("User {} enrolled in course {}", user_id, course.id);
    }

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(EnrollResponse {
            course_id: course.id,
            created,
        }),
    ))
}

/// Lesson page. Requires enrollment; creates the progress row on first view.
pub async fn get_lesson(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((course_id, lesson_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let course = fetch_course(&pool, course_id).await?;
    let lesson = fetch_lesson(&pool, lesson_id).await?;
    if lesson.course_id != course.id {
        return Err(AppError::NotFound(format!(
            "Lesson {} not found in course {}",
            lesson_id, course_id
        )));
    }

    if !is_enrolled(&pool, user_id, course.id).await? {
        return Err(AppError::Forbidden(
            "Enroll in the course to open its lessons".to_string(),
        ));
    }

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, lesson_id, question_text, "order"
        FROM questions
        WHERE lesson_id = $1
        ORDER BY "order", id
        "#,
    )
    .bind(lesson.id)
    .fetch_all(&pool)
    .await?;

    let choices = sqlx::query_as::<_, Choice>(
        r#"
        SELECT c.id, c.question_id, c.choice_text, c.is_correct
        FROM choices c
        JOIN questions q ON q.id = c.question_id
        WHERE q.lesson_id = $1
        ORDER BY c.id
        "#,
    )
    .bind(lesson.id)
    .fetch_all(&pool)
    .await?;

    let mut by_question: HashMap<i64, Vec<PublicChoice>> = HashMap::new();
    for choice in choices {
        by_question
            .entry(choice.question_id)
            .or_default()
            .push(PublicChoice {
                id: choice.id,
                text: choice.choice_text,
            });
    }

    let questions = questions
        .into_iter()
        .map(|q| LessonQuestion {
            choices: by_question.remove(&q.id).unwrap_or_default(),
            id: q.id,
            question_text: q.question_text,
        })
        .collect();

    let progress = ensure_progress(&pool, user_id, lesson.id).await?;
    let lessons = course_lessons(&pool, course.id).await?;
    let lesson_progress = lesson_statuses(&pool, user_id, course.id).await?;

    Ok(Json(LessonDetailResponse {
        lesson,
        questions,
        progress,
        lessons,
        lesson_progress,
    }))
}
