use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use validator::Validate;

use crate::dto::payment_dto::{
    CheckoutRequest, CheckoutResponse, PaymentListQuery, UpdatePricingRequest,
};
use crate::middleware::auth::Claims;
use crate::models::payment::PaymentStatus;
use crate::AppState;

#[axum::debug_handler]
pub async fn get_pricing(State(state): State<AppState>) -> crate::error::Result<Response> {
    let pricing = state.payment_service.pricing().await?;
    Ok(Json(pricing).into_response())
}

#[axum::debug_handler]
pub async fn checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CheckoutRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let payment = state.payment_service.checkout(user_id, req).await?;
    Ok(Json(CheckoutResponse {
        success: payment.status == PaymentStatus::Completed,
        payment,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentListQuery>,
) -> crate::error::Result<Response> {
    let overview = state
        .payment_service
        .overview(query.limit.unwrap_or(100))
        .await?;
    Ok(Json(overview).into_response())
}

#[axum::debug_handler]
pub async fn update_pricing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePricingRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let pricing = state
        .payment_service
        .update_pricing(claims.user_id().ok(), req)
        .await?;
    Ok(Json(pricing).into_response())
}
