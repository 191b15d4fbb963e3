//! HTTP handlers for the admin stage-transition endpoints

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::models::RecountExportRow;

use crate::error::AppResult;
use crate::middleware::auth::PERM_ADMIN;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::stage::{StageInfo, StageService};
use crate::AppState;

/// Current stage of the cycle
pub async fn get_current_stage(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<StageInfo>> {
    check_permission(&current_user.0, PERM_ADMIN.0, PERM_ADMIN.1)?;
    let service = StageService::new(state.db, state.item_master);
    let info = service.current_stage().await?;
    Ok(Json(info))
}

/// Open a new cycle at stage 1, wiping all prior counting data
pub async fn start_stage1(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<StageInfo>> {
    check_permission(&current_user.0, PERM_ADMIN.0, PERM_ADMIN.1)?;
    let service = StageService::new(state.db, state.item_master);
    let info = service.start_stage1().await?;
    Ok(Json(info))
}

/// Input for a stage advance
#[derive(Debug, Deserialize)]
pub struct AdvanceStageInput {
    pub next: i16,
}

/// Advance the cycle to the next stage
pub async fn advance_stage(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AdvanceStageInput>,
) -> AppResult<Json<StageInfo>> {
    check_permission(&current_user.0, PERM_ADMIN.0, PERM_ADMIN.1)?;
    let service = StageService::new(state.db, state.item_master);
    let info = service.advance_stage(input.next).await?;
    Ok(Json(info))
}

/// Close the cycle, keeping historical data for reporting
pub async fn finalize_cycle(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<StageInfo>> {
    check_permission(&current_user.0, PERM_ADMIN.0, PERM_ADMIN.1)?;
    let service = StageService::new(state.db, state.item_master);
    let info = service.finalize_cycle().await?;
    Ok(Json(info))
}

/// Recount list for a stage (JSON)
pub async fn get_recount_list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stage): Path<i16>,
) -> AppResult<Json<Vec<RecountExportRow>>> {
    check_permission(&current_user.0, PERM_ADMIN.0, PERM_ADMIN.1)?;
    let service = StageService::new(state.db, state.item_master);
    let rows = service.recount_list(stage).await?;
    Ok(Json(rows))
}

/// Recount list for a stage as CSV, for offline printing
pub async fn export_recount_list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stage): Path<i16>,
) -> AppResult<impl IntoResponse> {
    check_permission(&current_user.0, PERM_ADMIN.0, PERM_ADMIN.1)?;
    let service = StageService::new(state.db, state.item_master);
    let rows = service.recount_list(stage).await?;
    let csv = StageService::render_recount_csv(&rows)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    let disposition = format!("attachment; filename=\"recount_stage_{}.csv\"", stage);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((StatusCode::OK, headers, csv))
}
