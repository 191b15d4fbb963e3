//! HTTP handlers for the item-master capability

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::AppResult;
use crate::external::ItemMaster;
use crate::middleware::auth::PERM_ADMIN;
use crate::middleware::{check_permission, CurrentUser};
use crate::AppState;

/// Summary of the loaded item master
#[derive(Debug, Serialize)]
pub struct MasterSummary {
    pub items: usize,
    pub items_with_stock: usize,
    pub locations_with_stock: i64,
}

/// Re-read the item master file and swap the in-memory view wholesale
pub async fn reload_item_master(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<MasterSummary>> {
    check_permission(&current_user.0, PERM_ADMIN.0, PERM_ADMIN.1)?;

    let path = state.config.files.item_master_path.clone();
    // CSV parsing is blocking I/O; keep it off the runtime workers
    let master = tokio::task::spawn_blocking(move || ItemMaster::from_csv_path(&path))
        .await
        .map_err(|e| crate::error::AppError::Internal(e.to_string()))??;

    let summary = summarize(&master);
    state.item_master.replace(master);

    tracing::info!(items = summary.items, "item master reloaded");

    Ok(Json(summary))
}

/// Summary of the currently loaded item master
pub async fn get_master_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<MasterSummary>> {
    check_permission(&current_user.0, PERM_ADMIN.0, PERM_ADMIN.1)?;
    Ok(Json(summarize(&state.item_master.current())))
}

fn summarize(master: &ItemMaster) -> MasterSummary {
    MasterSummary {
        items: master.len(),
        items_with_stock: master.items_with_stock().len(),
        locations_with_stock: master.locations_with_stock(),
    }
}
