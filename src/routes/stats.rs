use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};

use crate::dto::stats_dto::{ResultsQuery, SeriesQuery, TopScoresQuery};
use crate::services::stats_service::SeriesWindow;
use crate::AppState;

fn series_window(query: &SeriesQuery) -> crate::error::Result<SeriesWindow> {
    match query.days.as_deref() {
        Some(days) => days.parse(),
        None => Ok(SeriesWindow::default()),
    }
}

#[axum::debug_handler]
pub async fn dashboard(State(state): State<AppState>) -> crate::error::Result<Response> {
    let stats = state.stats_service.dashboard().await?;
    Ok(Json(stats).into_response())
}

#[axum::debug_handler]
pub async fn tests_completed(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> crate::error::Result<Response> {
    let window = series_window(&query)?;
    let series = state.stats_service.tests_completed_series(window).await?;
    Ok(Json(series).into_response())
}

#[axum::debug_handler]
pub async fn daily_active_users(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> crate::error::Result<Response> {
    let window = series_window(&query)?;
    let series = state.stats_service.active_users_series(window).await?;
    Ok(Json(series).into_response())
}

#[axum::debug_handler]
pub async fn top_scores(
    State(state): State<AppState>,
    Query(query): Query<TopScoresQuery>,
) -> crate::error::Result<Response> {
    let board = state
        .stats_service
        .leaderboard(query.limit.unwrap_or(10))
        .await?;
    Ok(Json(board).into_response())
}

#[axum::debug_handler]
pub async fn results(
    State(state): State<AppState>,
    Query(query): Query<ResultsQuery>,
) -> crate::error::Result<Response> {
    let rows = state
        .stats_service
        .results(query.user_id, query.test_id)
        .await?;
    Ok(Json(rows).into_response())
}
