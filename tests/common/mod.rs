#![allow(dead_code)]

use std::env;
use std::sync::{Arc, Once};
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use satly_backend::{
    config::DenominatorPolicy,
    database::{ExamStore, InMemoryExamStore},
    middleware::auth::{issue_token, Claims, ADMIN_ROLE},
    models::{
        test_content::{Difficulty, ModuleKind, TestContent},
        user::{SubscriptionTier, User},
    },
    routes::api_router,
    services::payment_service::StubGateway,
    AppState,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret_key";

static INIT: Once = Once::new();

pub fn init() {
    INIT.call_once(|| {
        env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
        env::set_var("DATABASE_URL", "postgres://localhost/satly_unused");
        env::set_var("JWT_SECRET", JWT_SECRET);
        env::set_var("PUBLIC_RPS", "1000");
        env::set_var("ADMIN_RPS", "1000");
        env::set_var("PAYMENT_DELAY_MS", "0");
        satly_backend::config::init_config().expect("init config");
    });
}

pub struct TestApp {
    pub store: Arc<InMemoryExamStore>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        init();
        let store = Arc::new(InMemoryExamStore::new());
        let state = AppState::with_gateway(
            store.clone(),
            Arc::new(StubGateway::new(Duration::ZERO)),
            DenominatorPolicy::QuestionCount,
        );
        Self {
            router: api_router(state),
            store,
        }
    }

    pub async fn user(&self, name: &str, tier: SubscriptionTier) -> (Uuid, String) {
        let user = self
            .store
            .insert_user(&User::new(name, &format!("{name}@satly.uz"), tier))
            .await
            .expect("seed user");
        (user.id, token_for(user.id, None))
    }

    pub fn admin_token(&self) -> String {
        token_for(Uuid::new_v4(), Some(ADMIN_ROLE))
    }

    pub async fn module(&self, title: &str, kind: ModuleKind, count: usize) -> TestContent {
        let now = Utc::now();
        self.store
            .insert_test_content(&TestContent {
                id: Uuid::new_v4(),
                test_set_id: None,
                title: title.to_string(),
                description: String::new(),
                module_kind: kind,
                difficulty: Difficulty::Medium,
                duration_seconds: 1920,
                questions: question_list(count),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("seed module")
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
        };
        (status, json)
    }
}

/// Every question's key is `A`.
pub fn question_list(count: usize) -> JsonValue {
    let questions: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "text": format!("Question {i}"),
                "option_a": "yes",
                "option_b": "no",
                "option_c": "maybe",
                "option_d": "never",
                "correct_answer": "A"
            })
        })
        .collect();
    json!(questions)
}

pub fn token_for(user_id: Uuid, role: Option<&str>) -> String {
    issue_token(&Claims::new(user_id, role, 3600), JWT_SECRET).expect("sign token")
}
