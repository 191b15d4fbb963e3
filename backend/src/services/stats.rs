//! Per-stage counting statistics
//!
//! A derived view over the count log and the item master; holds no state of
//! its own.

use sqlx::PgPool;

use shared::models::{accuracy_ratio, coverage_ratio, StageStats, Variance};
use shared::validation::validate_counting_stage;

use crate::error::{AppError, AppResult};
use crate::external::SharedItemMaster;

/// Statistics service
#[derive(Clone)]
pub struct StatsService {
    db: PgPool,
    master: SharedItemMaster,
}

impl StatsService {
    /// Create a new StatsService instance
    pub fn new(db: PgPool, master: SharedItemMaster) -> Self {
        Self { db, master }
    }

    /// Aggregates for one stage of the current cycle.
    ///
    /// Zero-quantity counts count toward items_counted: they are evidence
    /// the operator visited the location.
    pub async fn stage_stats(&self, stage: i16) -> AppResult<StageStats> {
        validate_counting_stage(stage).map_err(|msg| AppError::Validation {
            field: "stage".to_string(),
            message: msg.to_string(),
            message_es: "Etapa inválida".to_string(),
        })?;

        let totals: Vec<(String, i64)> = sqlx::query_as(
            "SELECT sc.item_code, SUM(sc.counted_qty)::BIGINT AS counted_total \
             FROM stock_counts sc \
             JOIN count_sessions cs ON cs.id = sc.session_id \
             WHERE cs.inventory_stage = $1 \
             GROUP BY sc.item_code",
        )
        .bind(stage)
        .fetch_all(&self.db)
        .await?;

        let counted_locations: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT sc.counted_location) \
             FROM stock_counts sc \
             JOIN count_sessions cs ON cs.id = sc.session_id \
             WHERE cs.inventory_stage = $1",
        )
        .bind(stage)
        .fetch_one(&self.db)
        .await?;

        let master = self.master.current();
        let summary = summarize(
            totals
                .iter()
                .map(|(code, total)| (*total, master.qty(code).unwrap_or(0))),
        );

        let items_with_stock = master.items_with_stock().len() as i64;

        Ok(StageStats {
            stage,
            items_with_stock,
            locations_with_stock: master.locations_with_stock(),
            items_counted: summary.items_counted,
            counted_locations,
            items_with_discrepancy: summary.items_with_discrepancy,
            items_positive: summary.items_positive,
            items_negative: summary.items_negative,
            accuracy: accuracy_ratio(summary.items_counted, summary.items_with_discrepancy),
            coverage: coverage_ratio(
                summary.items_counted,
                summary.items_with_discrepancy,
                items_with_stock,
            ),
        })
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct VarianceSummary {
    items_counted: i64,
    items_with_discrepancy: i64,
    items_positive: i64,
    items_negative: i64,
}

/// Classify each (counted_total, system_qty) pair
fn summarize(pairs: impl Iterator<Item = (i64, i64)>) -> VarianceSummary {
    let mut summary = VarianceSummary::default();
    for (counted_total, system_qty) in pairs {
        summary.items_counted += 1;
        match Variance::classify(counted_total, system_qty) {
            Variance::Match => {}
            Variance::Over => {
                summary.items_with_discrepancy += 1;
                summary.items_positive += 1;
            }
            Variance::Short => {
                summary.items_with_discrepancy += 1;
                summary.items_negative += 1;
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_classifies_over_and_short() {
        let summary = summarize(vec![(10, 10), (12, 10), (3, 4), (0, 7)].into_iter());
        assert_eq!(
            summary,
            VarianceSummary {
                items_counted: 4,
                items_with_discrepancy: 3,
                items_positive: 1,
                items_negative: 2,
            }
        );
    }

    #[test]
    fn test_summarize_zero_count_of_unknown_item_matches() {
        // An item absent from the master has system qty 0; counting 0 of it
        // is not a discrepancy, but it still counts as visited.
        let summary = summarize(vec![(0, 0)].into_iter());
        assert_eq!(summary.items_counted, 1);
        assert_eq!(summary.items_with_discrepancy, 0);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(std::iter::empty());
        assert_eq!(summary, VarianceSummary::default());
    }
}
