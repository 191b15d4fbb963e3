//! HTTP handlers for admin corrections of recorded counts

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::PERM_ADMIN;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::counting::{CountingService, StockCount};
use crate::AppState;

/// Input for an admin quantity correction
#[derive(Debug, Deserialize)]
pub struct UpdateCountInput {
    pub counted_qty: i64,
}

/// Correct the quantity of a recorded count
pub async fn update_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(count_id): Path<i64>,
    Json(input): Json<UpdateCountInput>,
) -> AppResult<Json<StockCount>> {
    check_permission(&current_user.0, PERM_ADMIN.0, PERM_ADMIN.1)?;
    let service = CountingService::new(state.db, state.item_master);
    let count = service
        .admin_update_count_qty(count_id, input.counted_qty)
        .await?;
    Ok(Json(count))
}

/// Delete a recorded count
pub async fn delete_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(count_id): Path<i64>,
) -> AppResult<Json<()>> {
    check_permission(&current_user.0, PERM_ADMIN.0, PERM_ADMIN.1)?;
    let service = CountingService::new(state.db, state.item_master);
    service.admin_delete_count(count_id).await?;
    Ok(Json(()))
}
