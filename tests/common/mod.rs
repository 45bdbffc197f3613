// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use elearn_backend::{
    config::Config,
    routes,
    services::{notify::ConsoleMailer, storage::LocalDiskStore},
    state::AppState,
    utils::jwt::sign_jwt,
};
use sqlx::{PgPool, postgres::PgPoolOptions};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

pub struct TestApp {
    pub address: String,
    pub pool: PgPool,
    pub client: reqwest::Client,
}

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        media_root: std::env::temp_dir()
            .join(format!("elearn_media_{}", uuid::Uuid::new_v4().simple()))
            .to_string_lossy()
            .into_owned(),
        max_body_bytes: 1024 * 1024,
        site_url: None,
        mail_api_url: None,
        mail_api_token: None,
        default_from_email: "no-reply@example.com".to_string(),
        notify_timeout_secs: 1,
        reminder_interval_hours: 0,
    }
}

/// Spawns the app on a random port against `DATABASE_URL`.
/// Returns `None` when no database is configured so the suite can be skipped.
pub async fn spawn_app() -> Option<TestApp> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database test");
        return None;
    };

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = test_config(&database_url);
    let state = AppState {
        pool: pool.clone(),
        store: Arc::new(LocalDiskStore::new(&config.media_root)),
        notifier: Arc::new(ConsoleMailer::new(config.default_from_email.clone())),
        config,
    };

    let app = routes::create_router(state);

    // 4. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    // 5. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
    })
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Inserts a user with a unique name and returns (id, bearer token).
    pub async fn create_user(&self, role: &str) -> (i64, String) {
        let username = format!("u_{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO users (username, email, role) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&username)
        .bind(format!("{}@example.com", username))
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert user");

        let token = sign_jwt(id, role, JWT_SECRET, 600).expect("Failed to sign token");
        (id, token)
    }

    /// A signed learner the identity provider knows but the users mirror does not.
    pub fn unmirrored_user(&self) -> (i64, String) {
        let id = 8_000_000_000 + (uuid::Uuid::new_v4().as_u128() % 1_000_000_000) as i64;
        let token = sign_jwt(id, "user", JWT_SECRET, 600).expect("Failed to sign token");
        (id, token)
    }

    pub async fn create_course(&self) -> i64 {
        let (id,): (i64,) =
            sqlx::query_as("INSERT INTO courses (title) VALUES ($1) RETURNING id")
                .bind(format!("Course {}", uuid::Uuid::new_v4().simple()))
                .fetch_one(&self.pool)
                .await
                .expect("Failed to insert course");
        id
    }

    pub async fn create_lesson(&self, course_id: i64, order: i32) -> i64 {
        let (id,): (i64,) = sqlx::query_as(
            r#"INSERT INTO lessons (course_id, title, "order") VALUES ($1, $2, $3) RETURNING id"#,
        )
        .bind(course_id)
        .bind(format!("Lesson {}", order))
        .bind(order)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert lesson");
        id
    }

    /// Adds a two-choice question and returns (question id, correct choice, wrong choice).
    pub async fn create_question(&self, lesson_id: i64, order: i32) -> (i64, i64, i64) {
        let (question_id,): (i64,) = sqlx::query_as(
            r#"INSERT INTO questions (lesson_id, question_text, "order") VALUES ($1, $2, $3) RETURNING id"#,
        )
        .bind(lesson_id)
        .bind(format!("Question {}", order))
        .bind(order)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert question");

        let correct = self.insert_choice("choices", "choice_text", question_id, true).await;
        let wrong = self.insert_choice("choices", "choice_text", question_id, false).await;
        (question_id, correct, wrong)
    }

    pub async fn create_exam(&self, skill: &str) -> i64 {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO mock_exams (title, exam_type, skill) VALUES ($1, 'ielts', $2) RETURNING id",
        )
        .bind(format!("Exam {}", uuid::Uuid::new_v4().simple()))
        .bind(skill)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert exam");
        id
    }

    /// Adds an open question (no choices) to an exam.
    pub async fn create_open_question(&self, exam_id: i64, order: i32) -> i64 {
        let (id,): (i64,) = sqlx::query_as(
            r#"INSERT INTO mock_questions (exam_id, text, "order") VALUES ($1, $2, $3) RETURNING id"#,
        )
        .bind(exam_id)
        .bind(format!("Open question {}", order))
        .bind(order)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert mock question");
        id
    }

    /// Adds a multiple-choice exam question and returns (question id, correct choice, wrong choice).
    pub async fn create_choice_question(&self, exam_id: i64, order: i32) -> (i64, i64, i64) {
        let question_id = self.create_open_question(exam_id, order).await;
        let correct = self.insert_choice("mock_choices", "text", question_id, true).await;
        let wrong = self.insert_choice("mock_choices", "text", question_id, false).await;
        (question_id, correct, wrong)
    }

    async fn insert_choice(&self, table: &str, column: &str, question_id: i64, is_correct: bool) -> i64 {
        let sql = format!(
            "INSERT INTO {} (question_id, {}, is_correct) VALUES ($1, $2, $3) RETURNING id",
            table, column
        );
        let (id,): (i64,) = sqlx::query_as(&sql)
            .bind(question_id)
            .bind(if is_correct { "right" } else { "wrong" })
            .bind(is_correct)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to insert choice");
        id
    }

    pub async fn attempt_score(&self, attempt_id: i64) -> f64 {
        let (score,): (f64,) = sqlx::query_as("SELECT score FROM exam_attempts WHERE id = $1")
            .bind(attempt_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to load attempt");
        score
    }
}
