//! HTTP handlers for operator counting endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use crate::models::ItemSnapshot;
use shared::types::{PaginatedResponse, Pagination};

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::middleware::auth::PERM_COUNT;
use crate::services::counting::{
    CountSession, CountingService, SaveCountInput, SessionLocation, StartedSession, StockCount,
};
use crate::AppState;

/// Start a counting session, completing any prior in-progress session
pub async fn start_session(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<StartedSession>> {
    check_permission(&current_user.0, PERM_COUNT.0, PERM_COUNT.1)?;
    let service = CountingService::new(state.db, state.item_master);
    let started = service.start_session(current_user.0.user_id).await?;
    Ok(Json(started))
}

/// The caller's in-progress session, if any
pub async fn active_session(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Option<CountSession>>> {
    check_permission(&current_user.0, PERM_COUNT.0, PERM_COUNT.1)?;
    let service = CountingService::new(state.db, state.item_master);
    let session = service.active_session(current_user.0.user_id).await?;
    Ok(Json(session))
}

/// Close a session
pub async fn close_session(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(session_id): Path<i64>,
) -> AppResult<Json<()>> {
    check_permission(&current_user.0, PERM_COUNT.0, PERM_COUNT.1)?;
    let service = CountingService::new(state.db, state.item_master);
    service
        .close_session(session_id, current_user.0.user_id)
        .await?;
    Ok(Json(()))
}

/// Blind-count snapshot of an item (code, description, bin)
pub async fn get_item_for_counting(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((session_id, item_code)): Path<(i64, String)>,
) -> AppResult<Json<ItemSnapshot>> {
    check_permission(&current_user.0, PERM_COUNT.0, PERM_COUNT.1)?;
    let service = CountingService::new(state.db, state.item_master);
    let snapshot = service
        .get_item_for_counting(session_id, current_user.0.user_id, &item_code)
        .await?;
    Ok(Json(snapshot))
}

/// Record a count
pub async fn save_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(session_id): Path<i64>,
    Json(input): Json<SaveCountInput>,
) -> AppResult<Json<SaveCountResponse>> {
    check_permission(&current_user.0, PERM_COUNT.0, PERM_COUNT.1)?;
    let service = CountingService::new(state.db, state.item_master);
    let count_id = service
        .save_count(session_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(SaveCountResponse { count_id }))
}

/// List the locations tracked for a session
pub async fn list_locations(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(session_id): Path<i64>,
) -> AppResult<Json<Vec<SessionLocation>>> {
    check_permission(&current_user.0, PERM_COUNT.0, PERM_COUNT.1)?;
    let service = CountingService::new(state.db, state.item_master);
    let locations = service
        .list_locations(session_id, current_user.0.user_id)
        .await?;
    Ok(Json(locations))
}

/// Close a location for a session
pub async fn close_location(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((session_id, location_code)): Path<(i64, String)>,
) -> AppResult<Json<SessionLocation>> {
    check_permission(&current_user.0, PERM_COUNT.0, PERM_COUNT.1)?;
    let service = CountingService::new(state.db, state.item_master);
    let location = service
        .close_location(session_id, current_user.0.user_id, &location_code)
        .await?;
    Ok(Json(location))
}

/// Reopen a closed location
pub async fn reopen_location(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((session_id, location_code)): Path<(i64, String)>,
) -> AppResult<Json<SessionLocation>> {
    check_permission(&current_user.0, PERM_COUNT.0, PERM_COUNT.1)?;
    let service = CountingService::new(state.db, state.item_master);
    let location = service
        .reopen_location(session_id, current_user.0.user_id, &location_code)
        .await?;
    Ok(Json(location))
}

/// Counts recorded at one location of a session
pub async fn list_counts_at(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((session_id, location_code)): Path<(i64, String)>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<StockCount>>> {
    check_permission(&current_user.0, PERM_COUNT.0, PERM_COUNT.1)?;
    let service = CountingService::new(state.db, state.item_master);
    let counts = service
        .list_counts_at(session_id, current_user.0.user_id, &location_code, pagination)
        .await?;
    Ok(Json(counts))
}

/// Response for an accepted count
#[derive(Debug, Serialize)]
pub struct SaveCountResponse {
    pub count_id: i64,
}
