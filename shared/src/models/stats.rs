//! Per-stage counting statistics

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregates derived from the counts of one stage.
///
/// All counters are integers; `accuracy` and `coverage` are the only ratios
/// and are rendered to two decimals by the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageStats {
    pub stage: i16,
    pub items_with_stock: i64,
    pub locations_with_stock: i64,
    pub items_counted: i64,
    pub counted_locations: i64,
    pub items_with_discrepancy: i64,
    pub items_positive: i64,
    pub items_negative: i64,
    pub accuracy: Decimal,
    pub coverage: Decimal,
}

/// `(items_counted - items_with_discrepancy) / items_counted`, 0 when no
/// items were counted.
pub fn accuracy_ratio(items_counted: i64, items_with_discrepancy: i64) -> Decimal {
    ratio(items_counted - items_with_discrepancy, items_counted)
}

/// `(items_counted - items_with_discrepancy) / items_with_stock`, 0 when the
/// master lists no stocked items.
pub fn coverage_ratio(items_counted: i64, items_with_discrepancy: i64, items_with_stock: i64) -> Decimal {
    ratio(items_counted - items_with_discrepancy, items_with_stock)
}

fn ratio(numerator: i64, denominator: i64) -> Decimal {
    if denominator == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(numerator) / Decimal::from(denominator)
}
