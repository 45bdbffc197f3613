// tests/exam_tests.rs

mod common;

use serde_json::{Value, json};

/// A tiny valid-looking webm payload as a data URI.
const AUDIO_DATA_URI: &str = "data:audio/webm;base64,GkXfow==";

async fn submit(app: &common::TestApp, token: &str, exam_id: i64, answers: Value) -> reqwest::Response {
    app.client
        .post(app.url(&format!("/api/exams/{}/submit", exam_id)))
        .bearer_auth(token)
        .json(&json!({ "answers": answers }))
        .send()
        .await
        .expect("Failed to execute request")
}

async fn grade(
    app: &common::TestApp,
    admin_token: &str,
    kind: &str,
    submission_id: i64,
    score: f64,
) -> reqwest::Response {
    app.client
        .post(app.url(&format!(
            "/api/admin/submissions/{}/{}/grade",
            kind, submission_id
        )))
        .bearer_auth(admin_token)
        .json(&json!({ "score": score }))
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn composite_exam_averages_auto_and_speaking() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    let (_, token) = app.create_user("user").await;
    let exam_id = app.create_exam("listening").await;
    let (q1, q1_right, _) = app.create_choice_question(exam_id, 1).await;
    let (q2, _, q2_wrong) = app.create_choice_question(exam_id, 2).await;
    let q3 = app.create_open_question(exam_id, 3).await;

    let response = submit(
        &app,
        &token,
        exam_id,
        json!({
            q1.to_string(): { "choice": q1_right },
            q2.to_string(): { "choice": q2_wrong },
            q3.to_string(): { "speaking": { "score": 80 } },
        }),
    )
    .await;

    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["score"], 65.0);
    assert_eq!(body["max_score"], 100.0);
}

#[tokio::test]
async fn exam_without_questions_is_rejected_without_side_effects() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    let (user_id, token) = app.create_user("user").await;
    let exam_id = app.create_exam("reading").await;

    let response = submit(&app, &token, exam_id, json!({})).await;
    assert_eq!(response.status().as_u16(), 400);

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM exam_attempts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn unknown_exam_is_404() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    let (_, token) = app.create_user("user").await;

    let response = submit(&app, &token, 999_999_999, json!({})).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn malformed_answers_are_skipped() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    let (_, token) = app.create_user("user").await;
    let exam_id = app.create_exam("reading").await;
    let (q1, q1_right, _) = app.create_choice_question(exam_id, 1).await;
    let (q2, _, _) = app.create_choice_question(exam_id, 2).await;

    let response = submit(
        &app,
        &token,
        exam_id,
        json!({
            q1.to_string(): { "choice": q1_right },
            q2.to_string(): "not an answer",
            "abc": { "choice": 1 },
        }),
    )
    .await;

    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["score"], 50.0);
}

#[tokio::test]
async fn writing_grade_overwrites_single_skill_attempt() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    let (user_id, token) = app.create_user("user").await;
    let (_, admin_token) = app.create_user("admin").await;
    let exam_id = app.create_exam("writing").await;
    let question_id = app.create_open_question(exam_id, 1).await;

    let essay = "If a < b then <b>b</b> wins.<script>x</script>";
    let response = submit(
        &app,
        &token,
        exam_id,
        json!({ question_id.to_string(): { "writing": essay } }),
    )
    .await;
    let body: Value = response.json().await.unwrap();
    let attempt_id = body["attempt_id"].as_i64().unwrap();
    assert_eq!(body["score"], 0.0);

    // Stored exactly as written.
    let (submission_id, text): (i64, String) = sqlx::query_as(
        "SELECT id, text FROM writing_submissions WHERE user_id = $1 AND question_id = $2",
    )
    .bind(user_id)
    .bind(question_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(text, essay);

    // The review queue escapes it for display.
    let pending: Vec<Value> = app
        .client
        .get(app.url("/api/admin/submissions/writing"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entry = pending
        .iter()
        .find(|s| s["id"] == submission_id)
        .expect("submission should be pending");
    assert_eq!(entry["payload"], essay);
    let html = entry["payload_html"].as_str().unwrap();
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));

    let response = grade(&app, &admin_token, "writing", submission_id, 85.0).await;
    assert_eq!(response.status().as_u16(), 200);

    assert_eq!(app.attempt_score(attempt_id).await, 85.0);
}

#[tokio::test]
async fn mixed_exam_keeps_the_higher_score() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    let (user_id, token) = app.create_user("user").await;
    let (_, admin_token) = app.create_user("admin").await;
    let exam_id = app.create_exam("reading").await;
    let (q1, q1_right, _) = app.create_choice_question(exam_id, 1).await;
    let (q2, q2_right, _) = app.create_choice_question(exam_id, 2).await;
    let (q3, _, q3_wrong) = app.create_choice_question(exam_id, 3).await;
    let (q4, _, q4_wrong) = app.create_choice_question(exam_id, 4).await;
    let (q5, _, q5_wrong) = app.create_choice_question(exam_id, 5).await;
    let essay = app.create_open_question(exam_id, 6).await;

    // 2 of 5 auto-graded answers correct: 40.
    let response = submit(
        &app,
        &token,
        exam_id,
        json!({
            q1.to_string(): { "choice": q1_right },
            q2.to_string(): { "choice": q2_right },
            q3.to_string(): { "choice": q3_wrong },
            q4.to_string(): { "choice": q4_wrong },
            q5.to_string(): { "choice": q5_wrong },
            essay.to_string(): { "writing": "An answer" },
        }),
    )
    .await;
    let body: Value = response.json().await.unwrap();
    let attempt_id = body["attempt_id"].as_i64().unwrap();
    assert_eq!(body["score"], 40.0);

    let (submission_id,): (i64,) = sqlx::query_as(
        "SELECT id FROM writing_submissions WHERE user_id = $1 AND question_id = $2",
    )
    .bind(user_id)
    .bind(essay)
    .fetch_one(&app.pool)
    .await
    .unwrap();

    grade(&app, &admin_token, "writing", submission_id, 30.0).await;
    assert_eq!(app.attempt_score(attempt_id).await, 40.0);

    grade(&app, &admin_token, "writing", submission_id, 90.0).await;
    assert_eq!(app.attempt_score(attempt_id).await, 90.0);
}

#[tokio::test]
async fn speaking_audio_is_stored_for_review() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    let (user_id, token) = app.create_user("user").await;
    let (_, admin_token) = app.create_user("admin").await;
    let exam_id = app.create_exam("speaking").await;
    let question_id = app.create_open_question(exam_id, 1).await;

    let response = submit(
        &app,
        &token,
        exam_id,
        json!({ question_id.to_string(): { "speaking": { "audio": AUDIO_DATA_URI, "score": 72.5 } } }),
    )
    .await;
    let body: Value = response.json().await.unwrap();
    let attempt_id = body["attempt_id"].as_i64().unwrap();
    assert_eq!(body["score"], 72.5);

    let (submission_id, audio, reviewed): (i64, String, bool) = sqlx::query_as(
        "SELECT id, audio, reviewed FROM speaking_submissions WHERE user_id = $1 AND question_id = $2",
    )
    .bind(user_id)
    .bind(question_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert!(audio.starts_with("speaking_submissions/"));
    assert!(audio.ends_with(".webm"));
    assert!(!reviewed);

    let pending: Vec<Value> = app
        .client
        .get(app.url("/api/admin/submissions/speaking"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(pending.iter().any(|s| s["id"] == submission_id));

    grade(&app, &admin_token, "speaking", submission_id, 60.0).await;
    assert_eq!(app.attempt_score(attempt_id).await, 60.0);
}

#[tokio::test]
async fn learner_missing_from_users_mirror_can_submit_exams() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    let (user_id, token) = app.unmirrored_user();
    let exam_id = app.create_exam("writing").await;
    let question_id = app.create_open_question(exam_id, 1).await;

    let response = submit(
        &app,
        &token,
        exam_id,
        json!({ question_id.to_string(): { "writing": "Short essay" } }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 201);

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM writing_submissions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn grading_unknown_submission_is_404() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    let (_, admin_token) = app.create_user("admin").await;

    let response = grade(&app, &admin_token, "writing", 999_999_999, 50.0).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn grade_out_of_range_is_rejected() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    let (_, admin_token) = app.create_user("admin").await;

    let response = grade(&app, &admin_token, "writing", 1, 150.0).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn attempts_are_listed_newest_first() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    let (_, token) = app.create_user("user").await;
    let exam_id = app.create_exam("reading").await;
    let (q1, right, wrong) = app.create_choice_question(exam_id, 1).await;

    submit(&app, &token, exam_id, json!({ q1.to_string(): { "choice": wrong } })).await;
    submit(&app, &token, exam_id, json!({ q1.to_string(): { "choice": right } })).await;

    let attempts: Vec<Value> = app
        .client
        .get(app.url("/api/attempts"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["score"], 100.0);
    assert_eq!(attempts[1]["score"], 0.0);
    assert_eq!(attempts[0]["skill"], "reading");
}
