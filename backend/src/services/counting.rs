//! Cycle-count orchestration service
//!
//! Owns all writes to count sessions, per-session locations and stock
//! counts. Stage transitions live in `StageService`; this service only ever
//! reads the active stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::{
    ItemSnapshot, LocationStatus, SessionStatus, stage_requires_recount_list, STAGE_FULL_COUNT,
    STAGE_FIRST_RECOUNT,
};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{
    normalize_item_code, normalize_location_code, validate_code, validate_counted_qty,
};

use crate::error::{AppError, AppResult};
use crate::external::SharedItemMaster;

/// Counting service for session lifecycle, location closure and counts
#[derive(Clone)]
pub struct CountingService {
    db: PgPool,
    master: SharedItemMaster,
}

/// A count session record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CountSession {
    pub id: i64,
    pub user_id: Uuid,
    pub status: String,
    pub inventory_stage: i16,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl CountSession {
    pub fn is_in_progress(&self) -> bool {
        self.status == SessionStatus::InProgress.as_str()
    }
}

/// A per-session location record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SessionLocation {
    pub session_id: i64,
    pub location_code: String,
    pub status: String,
    pub closed_at: Option<DateTime<Utc>>,
}

/// One accepted stock count
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockCount {
    pub id: i64,
    pub session_id: i64,
    pub user_id: Uuid,
    pub item_code: String,
    pub item_description: String,
    pub counted_qty: i64,
    pub counted_location: String,
    pub bin_location_system: Option<String>,
    pub counted_at: DateTime<Utc>,
}

/// Result of starting a session
#[derive(Debug, Clone, Serialize)]
pub struct StartedSession {
    pub session_id: i64,
    pub stage: i16,
}

/// Input for saving a count
#[derive(Debug, Deserialize)]
pub struct SaveCountInput {
    pub item_code: String,
    pub counted_qty: i64,
    pub counted_location: String,
}

const SESSION_COLUMNS: &str = "id, user_id, status, inventory_stage, started_at, ended_at";
const COUNT_COLUMNS: &str = "id, session_id, user_id, item_code, item_description, counted_qty, \
                             counted_location, bin_location_system, counted_at";

impl CountingService {
    /// Create a new CountingService instance
    pub fn new(db: PgPool, master: SharedItemMaster) -> Self {
        Self { db, master }
    }

    /// Start a counting session for a user, completing any session the user
    /// still has in progress. The new session is pinned to the current stage.
    pub async fn start_session(&self, user_id: Uuid) -> AppResult<StartedSession> {
        let mut tx = self.db.begin().await?;

        let stage: i16 = sqlx::query_scalar("SELECT current_stage FROM stage_state WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?;

        if stage < STAGE_FULL_COUNT {
            return Err(AppError::StageInactive);
        }

        sqlx::query(
            "UPDATE count_sessions SET status = 'completed', ended_at = now() \
             WHERE user_id = $1 AND status = 'in_progress'",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let session_id: i64 = sqlx::query_scalar(
            "INSERT INTO count_sessions (user_id, status, inventory_stage) \
             VALUES ($1, 'in_progress', $2) RETURNING id",
        )
        .bind(user_id)
        .bind(stage)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user_id, session_id, stage, "counting session started");

        Ok(StartedSession { session_id, stage })
    }

    /// The user's in-progress session, if any
    pub async fn active_session(&self, user_id: Uuid) -> AppResult<Option<CountSession>> {
        let session = sqlx::query_as::<_, CountSession>(&format!(
            "SELECT {} FROM count_sessions WHERE user_id = $1 AND status = 'in_progress'",
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(session)
    }

    /// Close a session. Re-closing a completed session is a no-op success.
    pub async fn close_session(&self, session_id: i64, user_id: Uuid) -> AppResult<()> {
        let session = self.load_owned_session(session_id, user_id).await?;

        if !session.is_in_progress() {
            return Ok(());
        }

        sqlx::query(
            "UPDATE count_sessions SET status = 'completed', ended_at = now() WHERE id = $1",
        )
        .bind(session_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Snapshot of an item for a blind count: code, description and bin only.
    /// The system quantity is never exposed to the operator.
    pub async fn get_item_for_counting(
        &self,
        session_id: i64,
        user_id: Uuid,
        item_code: &str,
    ) -> AppResult<ItemSnapshot> {
        let session = self.load_owned_session(session_id, user_id).await?;
        require_in_progress(&session)?;

        let item_code = normalize_item_code(item_code);
        validate_item_code(&item_code)?;

        let stage = session.inventory_stage;
        self.stage_gate(&self.db, stage, &item_code).await?;

        let master = self.master.current();
        match master.get(&item_code) {
            Some(item) => Ok(ItemSnapshot::found(
                &item.code,
                &item.description,
                item.bin_location.as_deref(),
            )),
            // Recount stages only ever present items the master knows
            None if stage >= STAGE_FIRST_RECOUNT => Err(AppError::UnknownItem(item_code)),
            // Stage 1 permits blind counting of unknown items
            None => Ok(ItemSnapshot::unknown(&item_code)),
        }
    }

    /// Accept a count. Multiple counts of the same (item, location) by the
    /// same user accumulate by sum; a zero quantity records that the
    /// location was checked and the item was not found there.
    pub async fn save_count(
        &self,
        session_id: i64,
        user_id: Uuid,
        input: SaveCountInput,
    ) -> AppResult<i64> {
        validate_counted_qty(input.counted_qty)
            .map_err(|msg| AppError::InvalidQty(msg.to_string()))?;

        let item_code = normalize_item_code(&input.item_code);
        validate_item_code(&item_code)?;
        let location = normalize_location_code(&input.counted_location);
        validate_location_code(&location)?;

        let mut tx = self.db.begin().await?;

        let session = sqlx::query_as::<_, CountSession>(&format!(
            "SELECT {} FROM count_sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Session".to_string()))?;

        verify_owner(&session, user_id)?;
        require_in_progress(&session)?;

        self.stage_gate(&mut *tx, session.inventory_stage, &item_code)
            .await?;

        let location_status: Option<String> = sqlx::query_scalar(
            "SELECT status FROM session_locations WHERE session_id = $1 AND location_code = $2",
        )
        .bind(session_id)
        .bind(&location)
        .fetch_optional(&mut *tx)
        .await?;

        if location_status.as_deref() == Some(LocationStatus::Closed.as_str()) {
            return Err(AppError::LocationClosed(location));
        }

        // Best-effort snapshot of the master description and system bin;
        // both may be empty for items unknown at stage 1.
        let master = self.master.current();
        let (description, system_bin) = match master.get(&item_code) {
            Some(item) => (item.description.clone(), item.bin_location.clone()),
            None => (String::new(), None),
        };

        let count_id: i64 = sqlx::query_scalar(
            "INSERT INTO stock_counts \
             (session_id, user_id, item_code, item_description, counted_qty, counted_location, bin_location_system) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(&item_code)
        .bind(&description)
        .bind(input.counted_qty)
        .bind(&location)
        .bind(&system_bin)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            session_id,
            item_code = %item_code,
            qty = input.counted_qty,
            location = %location,
            "count accepted"
        );

        Ok(count_id)
    }

    /// Close a location for a session. Idempotent.
    pub async fn close_location(
        &self,
        session_id: i64,
        user_id: Uuid,
        location_code: &str,
    ) -> AppResult<SessionLocation> {
        let session = self.load_owned_session(session_id, user_id).await?;
        require_in_progress(&session)?;

        let location = normalize_location_code(location_code);
        validate_location_code(&location)?;

        let row = sqlx::query_as::<_, SessionLocation>(
            "INSERT INTO session_locations (session_id, location_code, status, closed_at) \
             VALUES ($1, $2, 'closed', now()) \
             ON CONFLICT (session_id, location_code) \
             DO UPDATE SET status = 'closed', closed_at = now() \
             RETURNING session_id, location_code, status, closed_at",
        )
        .bind(session_id)
        .bind(&location)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    /// Reopen a previously closed location
    pub async fn reopen_location(
        &self,
        session_id: i64,
        user_id: Uuid,
        location_code: &str,
    ) -> AppResult<SessionLocation> {
        self.load_owned_session(session_id, user_id).await?;

        let location = normalize_location_code(location_code);
        validate_location_code(&location)?;

        let row = sqlx::query_as::<_, SessionLocation>(
            "UPDATE session_locations SET status = 'open', closed_at = NULL \
             WHERE session_id = $1 AND location_code = $2 AND status = 'closed' \
             RETURNING session_id, location_code, status, closed_at",
        )
        .bind(session_id)
        .bind(&location)
        .fetch_optional(&self.db)
        .await?;

        row.ok_or(AppError::NotClosed(location))
    }

    /// Locations tracked for a session
    pub async fn list_locations(
        &self,
        session_id: i64,
        user_id: Uuid,
    ) -> AppResult<Vec<SessionLocation>> {
        self.load_owned_session(session_id, user_id).await?;

        let locations = sqlx::query_as::<_, SessionLocation>(
            "SELECT session_id, location_code, status, closed_at \
             FROM session_locations WHERE session_id = $1 ORDER BY location_code",
        )
        .bind(session_id)
        .fetch_all(&self.db)
        .await?;

        Ok(locations)
    }

    /// Counts recorded at one location of a session, oldest first
    pub async fn list_counts_at(
        &self,
        session_id: i64,
        user_id: Uuid,
        location_code: &str,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<StockCount>> {
        self.load_owned_session(session_id, user_id).await?;

        let location = normalize_location_code(location_code);
        validate_location_code(&location)?;

        let total_items: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_counts WHERE session_id = $1 AND counted_location = $2",
        )
        .bind(session_id)
        .bind(&location)
        .fetch_one(&self.db)
        .await?;

        let counts = sqlx::query_as::<_, StockCount>(&format!(
            "SELECT {} FROM stock_counts \
             WHERE session_id = $1 AND counted_location = $2 \
             ORDER BY counted_at, id LIMIT $3 OFFSET $4",
            COUNT_COLUMNS
        ))
        .bind(session_id)
        .bind(&location)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: counts,
            pagination: PaginationMeta {
                page: pagination.page,
                per_page: pagination.per_page,
                total_items: total_items.max(0) as u64,
            },
        })
    }

    /// Admin edit of a recorded quantity
    pub async fn admin_update_count_qty(&self, count_id: i64, qty: i64) -> AppResult<StockCount> {
        validate_counted_qty(qty).map_err(|msg| AppError::InvalidQty(msg.to_string()))?;

        let count = sqlx::query_as::<_, StockCount>(&format!(
            "UPDATE stock_counts SET counted_qty = $1 WHERE id = $2 RETURNING {}",
            COUNT_COLUMNS
        ))
        .bind(qty)
        .bind(count_id)
        .fetch_optional(&self.db)
        .await?;

        count.ok_or_else(|| AppError::NotFound("Count".to_string()))
    }

    /// Admin delete of a recorded count
    pub async fn admin_delete_count(&self, count_id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM stock_counts WHERE id = $1")
            .bind(count_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Count".to_string()));
        }

        Ok(())
    }

    /// The single stage gate: stages >= 2 only accept items on the recount
    /// list for that stage. Both item lookup and count acceptance go
    /// through here.
    async fn stage_gate<'e, E>(&self, executor: E, stage: i16, item_code: &str) -> AppResult<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        if !stage_requires_recount_list(stage) {
            return Ok(());
        }

        let listed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM recount_items WHERE item_code = $1 AND stage_to_count = $2)",
        )
        .bind(item_code)
        .bind(stage)
        .fetch_one(executor)
        .await?;

        if !listed {
            return Err(AppError::NotOnRecount {
                item_code: item_code.to_string(),
                stage,
            });
        }

        Ok(())
    }

    async fn load_owned_session(&self, session_id: i64, user_id: Uuid) -> AppResult<CountSession> {
        let session = sqlx::query_as::<_, CountSession>(&format!(
            "SELECT {} FROM count_sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Session".to_string()))?;

        verify_owner(&session, user_id)?;
        Ok(session)
    }
}

fn verify_owner(session: &CountSession, user_id: Uuid) -> AppResult<()> {
    if session.user_id != user_id {
        return Err(AppError::Forbidden(
            "Session belongs to another user".to_string(),
        ));
    }
    Ok(())
}

fn require_in_progress(session: &CountSession) -> AppResult<()> {
    if !session.is_in_progress() {
        return Err(AppError::Forbidden(
            "Session is not in progress".to_string(),
        ));
    }
    Ok(())
}

fn validate_item_code(code: &str) -> AppResult<()> {
    validate_code(code).map_err(|msg| AppError::Validation {
        field: "item_code".to_string(),
        message: msg.to_string(),
        message_es: "Código de artículo inválido".to_string(),
    })
}

fn validate_location_code(code: &str) -> AppResult<()> {
    validate_code(code).map_err(|msg| AppError::Validation {
        field: "location_code".to_string(),
        message: msg.to_string(),
        message_es: "Código de ubicación inválido".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(status: &str, user_id: Uuid) -> CountSession {
        CountSession {
            id: 1,
            user_id,
            status: status.to_string(),
            inventory_stage: 1,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    #[test]
    fn test_verify_owner() {
        let owner = Uuid::new_v4();
        let s = session("in_progress", owner);
        assert!(verify_owner(&s, owner).is_ok());
        assert!(verify_owner(&s, Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_require_in_progress() {
        let owner = Uuid::new_v4();
        assert!(require_in_progress(&session("in_progress", owner)).is_ok());
        assert!(require_in_progress(&session("completed", owner)).is_err());
    }

    #[test]
    fn test_code_validation_rejects_empty() {
        assert!(validate_item_code("").is_err());
        assert!(validate_location_code("A-01").is_ok());
    }
}
