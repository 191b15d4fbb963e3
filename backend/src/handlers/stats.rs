//! HTTP handlers for the per-stage statistics endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::models::StageStats;

use crate::error::AppResult;
use crate::middleware::auth::PERM_ADMIN;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::stats::StatsService;
use crate::AppState;

/// Aggregates for one stage; ratios rendered to two decimals
pub async fn get_stage_stats(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stage): Path<i16>,
) -> AppResult<Json<StageStats>> {
    check_permission(&current_user.0, PERM_ADMIN.0, PERM_ADMIN.1)?;
    let service = StatsService::new(state.db, state.item_master);
    let mut stats = service.stage_stats(stage).await?;
    stats.accuracy = stats.accuracy.round_dp(2);
    stats.coverage = stats.coverage.round_dp(2);
    Ok(Json(stats))
}
