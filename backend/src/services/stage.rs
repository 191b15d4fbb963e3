//! Stage-transition engine
//!
//! Admin-only operations driving the inventory cycle: the stage-1 hard
//! reset, consecutive stage advances with recount-list regeneration, cycle
//! finalization, and recount-list export. All transitions serialize on an
//! exclusive lock of the stage_state row.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::PgPool;

use shared::models::{
    derive_recount_list, is_valid_stage_advance, RecountExportRow, STAGE_FULL_COUNT,
    STAGE_INACTIVE, UNKNOWN_ITEM_BIN, UNKNOWN_ITEM_DESCRIPTION,
};
use shared::validation::validate_counting_stage;

use crate::error::{AppError, AppResult};
use crate::external::SharedItemMaster;

/// Stage-transition service
#[derive(Clone)]
pub struct StageService {
    db: PgPool,
    master: SharedItemMaster,
}

/// Current stage as reported to callers
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StageInfo {
    pub current_stage: i16,
}

impl StageService {
    /// Create a new StageService instance
    pub fn new(db: PgPool, master: SharedItemMaster) -> Self {
        Self { db, master }
    }

    /// The process-wide active stage (0 = no open cycle)
    pub async fn current_stage(&self) -> AppResult<StageInfo> {
        let current_stage: i16 =
            sqlx::query_scalar("SELECT current_stage FROM stage_state WHERE id = 1")
                .fetch_one(&self.db)
                .await?;

        Ok(StageInfo { current_stage })
    }

    /// Open a new cycle at stage 1.
    ///
    /// Stage 1 is a wall-clean full count: all counts, sessions, locations
    /// and recount lists from the previous cycle are destroyed and id
    /// sequences restart from the base.
    pub async fn start_stage1(&self) -> AppResult<StageInfo> {
        let mut tx = self.db.begin().await?;

        sqlx::query("SELECT current_stage FROM stage_state WHERE id = 1 FOR UPDATE")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "TRUNCATE stock_counts, session_locations, count_sessions, recount_items \
             RESTART IDENTITY CASCADE",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE stage_state SET current_stage = $1, updated_at = now() WHERE id = 1")
            .bind(STAGE_FULL_COUNT)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("cycle reset: stage 1 opened, prior counting data wiped");

        Ok(StageInfo {
            current_stage: STAGE_FULL_COUNT,
        })
    }

    /// Advance to the next stage, regenerating that stage's recount list
    /// from the previous stage's discrepancies.
    ///
    /// Re-running a completed advance fails the precondition rather than
    /// duplicating work; re-running an interrupted one rebuilds the same
    /// list because the target stage is cleared before repopulation.
    pub async fn advance_stage(&self, next: i16) -> AppResult<StageInfo> {
        let mut tx = self.db.begin().await?;

        let current: i16 =
            sqlx::query_scalar("SELECT current_stage FROM stage_state WHERE id = 1 FOR UPDATE")
                .fetch_one(&mut *tx)
                .await?;

        if !is_valid_stage_advance(current, next) {
            return Err(AppError::OutOfOrder {
                current,
                requested: next,
            });
        }

        let prev = next - 1;

        // Clear before insert so a re-run yields the same set
        sqlx::query("DELETE FROM recount_items WHERE stage_to_count = $1")
            .bind(next)
            .execute(&mut *tx)
            .await?;

        let totals: Vec<(String, i64)> = sqlx::query_as(
            "SELECT sc.item_code, SUM(sc.counted_qty)::BIGINT AS counted_total \
             FROM stock_counts sc \
             JOIN count_sessions cs ON cs.id = sc.session_id \
             WHERE cs.inventory_stage = $1 \
             GROUP BY sc.item_code",
        )
        .bind(prev)
        .fetch_all(&mut *tx)
        .await?;

        let counted_totals: BTreeMap<String, i64> = totals.into_iter().collect();
        let master = self.master.current();
        let recount = derive_recount_list(&counted_totals, |code| master.qty(code));

        for item_code in &recount {
            sqlx::query(
                "INSERT INTO recount_items (item_code, stage_to_count) VALUES ($1, $2) \
                 ON CONFLICT (item_code, stage_to_count) DO NOTHING",
            )
            .bind(item_code)
            .bind(next)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE stage_state SET current_stage = $1, updated_at = now() WHERE id = 1")
            .bind(next)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            stage = next,
            recount_items = recount.len(),
            "stage advanced, recount list rebuilt"
        );

        Ok(StageInfo {
            current_stage: next,
        })
    }

    /// Close the cycle. Historical counts and recount lists are kept for
    /// reporting; only the stage returns to inactive.
    pub async fn finalize_cycle(&self) -> AppResult<StageInfo> {
        let mut tx = self.db.begin().await?;

        sqlx::query("SELECT current_stage FROM stage_state WHERE id = 1 FOR UPDATE")
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE stage_state SET current_stage = $1, updated_at = now() WHERE id = 1")
            .bind(STAGE_INACTIVE)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("cycle finalized, stage back to inactive");

        Ok(StageInfo {
            current_stage: STAGE_INACTIVE,
        })
    }

    /// The recount list for a stage joined with the master, for offline
    /// printing.
    pub async fn recount_list(&self, stage: i16) -> AppResult<Vec<RecountExportRow>> {
        validate_counting_stage(stage).map_err(|msg| AppError::Validation {
            field: "stage".to_string(),
            message: msg.to_string(),
            message_es: "Etapa inválida".to_string(),
        })?;

        let codes: Vec<String> = sqlx::query_scalar(
            "SELECT item_code FROM recount_items WHERE stage_to_count = $1 ORDER BY item_code",
        )
        .bind(stage)
        .fetch_all(&self.db)
        .await?;

        let master = self.master.current();
        let rows = codes
            .into_iter()
            .map(|code| match master.get(&code) {
                Some(item) => RecountExportRow {
                    item_code: item.code.clone(),
                    description: item.description.clone(),
                    bin_location: item
                        .bin_location
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_ITEM_BIN.to_string()),
                },
                None => RecountExportRow {
                    item_code: code,
                    description: UNKNOWN_ITEM_DESCRIPTION.to_string(),
                    bin_location: UNKNOWN_ITEM_BIN.to_string(),
                },
            })
            .collect();

        Ok(rows)
    }

    /// Render a recount list as CSV for printing
    pub fn render_recount_csv(rows: &[RecountExportRow]) -> AppResult<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| AppError::Internal(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_recount_csv() {
        let rows = vec![
            RecountExportRow {
                item_code: "ITEM-A".into(),
                description: "Tornillo 3mm".into(),
                bin_location: "A-01".into(),
            },
            RecountExportRow {
                item_code: "ITEM-B".into(),
                description: "Tuerca 5mm".into(),
                bin_location: "N/A".into(),
            },
        ];

        let csv = StageService::render_recount_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("item_code,description,bin_location")
        );
        assert_eq!(lines.next(), Some("ITEM-A,Tornillo 3mm,A-01"));
        assert_eq!(lines.next(), Some("ITEM-B,Tuerca 5mm,N/A"));
    }

    #[test]
    fn test_render_recount_csv_empty() {
        let csv = StageService::render_recount_csv(&[]).unwrap();
        assert!(csv.is_empty());
    }
}
