use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::exam_dto::{
    FinishSectionRequest, FinishSectionResponse, SessionRequest, StartExamQuery,
    StartExamResponse, SubmitAnswerRequest, SuccessResponse, TimeUpdateRequest,
};
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn start_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<StartExamQuery>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let active = state
        .exam_service
        .start_or_resume(user_id, query.test_id)
        .await?;
    Ok(Json(StartExamResponse::from(active)).into_response())
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let outcome = state
        .exam_service
        .record_answer(user_id, req.session_id, &req.question_index, &req.selected_answer)
        .await?;
    Ok(Json(SuccessResponse {
        success: outcome.is_recorded(),
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn update_time(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TimeUpdateRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let success = state
        .exam_service
        .heartbeat(user_id, req.session_id, req.time_spent)
        .await?;
    Ok(Json(SuccessResponse { success }).into_response())
}

#[axum::debug_handler]
pub async fn finish_section(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FinishSectionRequest>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let next_action = state
        .exam_service
        .finish_section(user_id, req.session_id, req.module_id)
        .await?;
    Ok(Json(FinishSectionResponse { next_action }).into_response())
}

#[axum::debug_handler]
pub async fn start_math(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SessionRequest>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    state.exam_service.start_math(user_id, req.session_id).await?;
    Ok(Json(SuccessResponse { success: true }).into_response())
}

#[axum::debug_handler]
pub async fn abandon(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SessionRequest>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    state.exam_service.abandon(user_id, req.session_id).await?;
    Ok(Json(SuccessResponse { success: true }).into_response())
}

#[axum::debug_handler]
pub async fn get_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let result = state.exam_service.result(user_id, session_id).await?;
    Ok(Json(result).into_response())
}

#[axum::debug_handler]
pub async fn get_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let progress = state.stats_service.progress(user_id).await?;
    Ok(Json(progress).into_response())
}
