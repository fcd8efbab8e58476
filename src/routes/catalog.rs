use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::database::store::ModuleFilter;
use crate::dto::catalog_dto::{ModuleListQuery, SaveModuleRequest, UpdateModuleRequest};
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_available_tests(
    State(state): State<AppState>,
) -> crate::error::Result<Response> {
    let sets = state.catalog_service.list_available_sets().await?;
    Ok(Json(sets).into_response())
}

#[axum::debug_handler]
pub async fn list_modules(
    State(state): State<AppState>,
    Query(query): Query<ModuleListQuery>,
) -> crate::error::Result<Response> {
    let filter = ModuleFilter {
        kind: query.kind,
        is_active: query.active,
    };
    let modules = state.catalog_service.list_modules(&filter).await?;
    Ok(Json(modules).into_response())
}

#[axum::debug_handler]
pub async fn save_module(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SaveModuleRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let saved = state.catalog_service.save_module(req).await?;
    state
        .audit_service
        .record(
            claims.user_id().ok(),
            if saved.created { "test_content.created" } else { "test_content.replaced" },
            "test_content",
            saved.module.id,
            Some(json!({
                "title": saved.module.title,
                "module_kind": saved.module.module_kind,
                "questions": saved.module.question_count(),
            })),
        )
        .await;
    let status = if saved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(saved)).into_response())
}

#[axum::debug_handler]
pub async fn get_module(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let module = state.catalog_service.get_module(id).await?;
    Ok(Json(module).into_response())
}

#[axum::debug_handler]
pub async fn update_module(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateModuleRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let changes = serde_json::to_value(&req)?;
    let module = state.catalog_service.update_module(id, req).await?;
    state
        .audit_service
        .record(
            claims.user_id().ok(),
            "test_content.updated",
            "test_content",
            id,
            Some(changes),
        )
        .await;
    Ok(Json(module).into_response())
}

#[axum::debug_handler]
pub async fn delete_module(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    state.catalog_service.delete_module(id).await?;
    state
        .audit_service
        .record(
            claims.user_id().ok(),
            "test_content.deleted",
            "test_content",
            id,
            None,
        )
        .await;
    Ok(StatusCode::NO_CONTENT.into_response())
}
