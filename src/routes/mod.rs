pub mod catalog;
pub mod exam;
pub mod health;
pub mod payment;
pub mod stats;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};

use crate::middleware::auth::{require_admin, require_bearer_auth};
use crate::middleware::rate_limit::{new_rps_state, rps_middleware};
use crate::AppState;

/// Every JSON route. Static media and the outer tower layers are added by the
/// binary.
pub fn api_router(state: AppState) -> Router {
    let config = crate::config::get_config();

    let user_api = Router::new()
        .route("/api/exam/start", post(exam::start_exam))
        .route("/api/exam/answer", post(exam::submit_answer))
        .route("/api/exam/time", post(exam::update_time))
        .route("/api/exam/finish-section", post(exam::finish_section))
        .route("/api/exam/start-math", post(exam::start_math))
        .route("/api/exam/abandon", post(exam::abandon))
        .route("/api/exam/results/:session_id", get(exam::get_result))
        .route("/api/exam/progress", get(exam::get_progress))
        .route("/api/tests/available", get(catalog::list_available_tests))
        .route("/api/pricing", get(payment::get_pricing))
        .route("/api/payments/checkout", post(payment::checkout))
        .layer(from_fn_with_state(
            new_rps_state(config.public_rps),
            rps_middleware,
        ))
        .layer(from_fn(require_bearer_auth));

    let admin_api = Router::new()
        .route(
            "/api/admin/tests",
            get(catalog::list_modules).post(catalog::save_module),
        )
        .route(
            "/api/admin/tests/:id",
            get(catalog::get_module)
                .patch(catalog::update_module)
                .delete(catalog::delete_module),
        )
        .route("/api/admin/payments", get(payment::list_payments))
        .route(
            "/api/admin/pricing",
            get(payment::get_pricing).put(payment::update_pricing),
        )
        .route("/api/admin/dashboard", get(stats::dashboard))
        .route(
            "/api/admin/dashboard/tests-completed",
            get(stats::tests_completed),
        )
        .route(
            "/api/admin/dashboard/daily-active-users",
            get(stats::daily_active_users),
        )
        .route("/api/admin/dashboard/top-scores", get(stats::top_scores))
        .route("/api/admin/results", get(stats::results))
        .layer(from_fn_with_state(
            new_rps_state(config.admin_rps),
            rps_middleware,
        ))
        .layer(from_fn(require_admin));

    Router::new()
        .route("/health", get(health::health))
        .merge(user_api)
        .merge(admin_api)
        .with_state(state)
}
