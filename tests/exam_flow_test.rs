mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use satly_backend::models::{test_content::ModuleKind, user::SubscriptionTier};
use serde_json::{json, Value as JsonValue};

async fn seed_full_set(app: &TestApp) -> Vec<uuid::Uuid> {
    let mut ids = Vec::new();
    for (kind, count) in [
        (ModuleKind::EnglishModule1, 4),
        (ModuleKind::EnglishModule2, 4),
        (ModuleKind::MathModule1, 5),
        (ModuleKind::MathModule2, 5),
    ] {
        ids.push(app.module("Mock SAT 1", kind, count).await.id);
    }
    ids
}

async fn start(app: &TestApp, token: &str) -> (StatusCode, JsonValue) {
    app.call(Method::POST, "/api/exam/start", Some(token), None).await
}

async fn answer_module(app: &TestApp, token: &str, session: &str, correct: usize, total: usize) {
    for i in 0..total {
        let label = if i < correct { "A" } else { "B" };
        let (status, body) = app
            .call(
                Method::POST,
                "/api/exam/answer",
                Some(token),
                Some(json!({"session_id": session, "question_index": i, "selected_answer": label})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }
}

async fn finish(app: &TestApp, token: &str, session: &str) -> (StatusCode, JsonValue) {
    app.call(
        Method::POST,
        "/api/exam/finish-section",
        Some(token),
        Some(json!({"session_id": session})),
    )
    .await
}

#[tokio::test]
async fn full_exam_over_http() {
    let app = TestApp::new();
    let ids = seed_full_set(&app).await;
    let (_, token) = app.user("aziza", SubscriptionTier::Premium).await;

    let (status, body) = start(&app, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resumed"], false);
    assert_eq!(body["show_break"], false);
    assert_eq!(body["module_id"], json!(ids[0]));
    assert_eq!(body["section_title"], "Mock SAT 1 - English (Module 1)");
    assert_eq!(body["time_remaining_seconds"], 1920);
    assert_eq!(body["questions"].as_array().unwrap().len(), 4);
    assert!(body["questions"][0].get("correct_answer").is_none());
    let session = body["session"]["id"].as_str().unwrap().to_string();

    answer_module(&app, &token, &session, 3, 4).await;
    let (status, body) = finish(&app, &token, &session).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["next_action"], "next_module");

    let (_, body) = start(&app, &token).await;
    assert_eq!(body["resumed"], true);
    assert_eq!(body["session"]["id"], json!(session));
    assert_eq!(body["module_id"], json!(ids[1]));
    assert_eq!(body["restored_answers"], json!([]));

    answer_module(&app, &token, &session, 4, 4).await;
    let (_, body) = finish(&app, &token, &session).await;
    assert_eq!(body["next_action"], "break");

    let (_, body) = start(&app, &token).await;
    assert_eq!(body["show_break"], true);
    assert_eq!(body["session"]["english_score"], 725);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/exam/start-math",
            Some(&token),
            Some(json!({"session_id": session})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = start(&app, &token).await;
    assert_eq!(body["module_id"], json!(ids[2]));
    assert_eq!(body["section_title"], "Mock SAT 1 - Math (Module 1)");
    answer_module(&app, &token, &session, 5, 5).await;
    let (_, body) = finish(&app, &token, &session).await;
    assert_eq!(body["next_action"], "next_module");

    answer_module(&app, &token, &session, 3, 5).await;
    let (_, body) = finish(&app, &token, &session).await;
    assert_eq!(body["next_action"], "results");

    let (status, result) = app
        .call(
            Method::GET,
            &format!("/api/exam/results/{session}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["english_score"], 725);
    assert_eq!(result["math_score"], 680);
    assert_eq!(result["total_score"], 1405);
    assert_eq!(result["reading_score"], 36);
    assert_eq!(result["math_subscore"], 34);
    assert_eq!(result["section_percentile"], 95);
    assert_eq!(result["overall_percentile"], 94);
    let certificate = result["certificate_id"].as_str().unwrap();
    assert!(certificate.starts_with("SATLY-"));
    assert_eq!(certificate.len(), 23);

    // A repeated finish reports results without counting the exam twice.
    let (status, body) = finish(&app, &token, &session).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["next_action"], "results");

    let (_, progress) = app
        .call(Method::GET, "/api/exam/progress", Some(&token), None)
        .await;
    assert_eq!(progress["tests_completed"], 1);
    assert_eq!(progress["best_score"], 1405);
    assert_eq!(progress["recent"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn answers_are_upserted_and_restored() {
    let app = TestApp::new();
    seed_full_set(&app).await;
    let (_, token) = app.user("bobur", SubscriptionTier::Premium).await;
    let (_, body) = start(&app, &token).await;
    let session = body["session"]["id"].as_str().unwrap().to_string();
    let session_id: uuid::Uuid = session.parse().unwrap();

    for label in ["B", "C"] {
        let (_, body) = app
            .call(
                Method::POST,
                "/api/exam/answer",
                Some(&token),
                Some(json!({"session_id": session, "question_index": "2", "selected_answer": label})),
            )
            .await;
        assert_eq!(body["success"], true);
    }
    assert_eq!(app.store.answer_count(session_id), 1);

    let (_, body) = start(&app, &token).await;
    assert_eq!(
        body["restored_answers"],
        json!([{"question_index": 2, "selected_answer": "C"}])
    );
}

#[tokio::test]
async fn malformed_answers_are_dropped() {
    let app = TestApp::new();
    seed_full_set(&app).await;
    let (_, token) = app.user("dilnoza", SubscriptionTier::Premium).await;
    let (_, body) = start(&app, &token).await;
    let session = body["session"]["id"].as_str().unwrap().to_string();

    for index in [json!("abc"), json!(99), json!(-1)] {
        let (status, body) = app
            .call(
                Method::POST,
                "/api/exam/answer",
                Some(&token),
                Some(json!({"session_id": session, "question_index": index, "selected_answer": "A"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
    }
    assert_eq!(app.store.answer_count(session.parse().unwrap()), 0);
}

#[tokio::test]
async fn sessions_of_other_users_are_hidden() {
    let app = TestApp::new();
    seed_full_set(&app).await;
    let (_, owner) = app.user("owner", SubscriptionTier::Premium).await;
    let (_, intruder) = app.user("intruder", SubscriptionTier::Premium).await;
    let (_, body) = start(&app, &owner).await;
    let session = body["session"]["id"].as_str().unwrap().to_string();

    let (status, _) = finish(&app, &intruder, &session).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .call(
            Method::POST,
            "/api/exam/time",
            Some(&intruder),
            Some(json!({"session_id": session, "time_spent": 60})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn heartbeat_stops_after_abandon() {
    let app = TestApp::new();
    seed_full_set(&app).await;
    let (_, token) = app.user("eldor", SubscriptionTier::Premium).await;
    let (_, body) = start(&app, &token).await;
    let session = body["session"]["id"].as_str().unwrap().to_string();

    let beat = json!({"session_id": session, "time_spent": 600});
    let (_, body) = app
        .call(Method::POST, "/api/exam/time", Some(&token), Some(beat.clone()))
        .await;
    assert_eq!(body["success"], true);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/exam/abandon",
            Some(&token),
            Some(json!({"session_id": session})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .call(Method::POST, "/api/exam/time", Some(&token), Some(beat))
        .await;
    assert_eq!(body["success"], false);

    let (status, _) = finish(&app, &token, &session).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/exam/results/{session}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn free_user_pays_once_per_exam() {
    let app = TestApp::new();
    seed_full_set(&app).await;
    let (_, token) = app.user("farrukh", SubscriptionTier::Free).await;

    let (status, _) = start(&app, &token).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/payments/checkout",
            Some(&token),
            Some(json!({"payment_method": "click"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["payment"]["status"], "completed");
    assert_eq!(body["payment"]["amount"], "19999.00");

    let (status, body) = start(&app, &token).await;
    assert_eq!(status, StatusCode::OK);
    let session = body["session"]["id"].as_str().unwrap().to_string();
    app.call(
        Method::POST,
        "/api/exam/abandon",
        Some(&token),
        Some(json!({"session_id": session})),
    )
    .await;

    let (status, _) = start(&app, &token).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn declined_card_is_reported() {
    let app = TestApp::new();
    let (_, token) = app.user("gulnora", SubscriptionTier::Free).await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/payments/checkout",
            Some(&token),
            Some(json!({
                "payment_method": "uzcard",
                "card_number": "8600 1234 5678 90ab",
                "card_expiry": "12/29"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Payment declined"));
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::POST, "/api/exam/start", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_authorization");

    let (status, _) = app
        .call(Method::POST, "/api/exam/start", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
