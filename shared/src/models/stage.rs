//! Inventory stage and recount-list models
//!
//! A cycle runs through stages 1..=4. Stage 1 is a wall-clean full count;
//! stages 2..=4 are restricted to the recount list derived from the previous
//! stage's discrepancies. Stage 0 means no cycle is open.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Stage value meaning "no active cycle"
pub const STAGE_INACTIVE: i16 = 0;

/// First stage of a cycle (full wall-clean count)
pub const STAGE_FULL_COUNT: i16 = 1;

/// Last stage of a cycle
pub const STAGE_MAX: i16 = 4;

/// First stage gated by the recount list
pub const STAGE_FIRST_RECOUNT: i16 = 2;

/// Status column of a recount item. Reserved: gating is membership-only and
/// no operation currently flips it to `Counted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecountItemStatus {
    Pending,
    Counted,
}

impl RecountItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecountItemStatus::Pending => "pending",
            RecountItemStatus::Counted => "counted",
        }
    }
}

/// An item eligible for counting in a recount stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecountItem {
    pub item_code: String,
    pub stage_to_count: i16,
    pub status: RecountItemStatus,
}

/// Recount-list export row for offline printing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecountExportRow {
    pub item_code: String,
    pub description: String,
    pub bin_location: String,
}

/// How a counted total compares with the system quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variance {
    Match,
    /// Counted more than the system expects
    Over,
    /// Counted less than the system expects
    Short,
}

impl Variance {
    pub fn classify(counted_total: i64, system_qty: i64) -> Self {
        match counted_total.cmp(&system_qty) {
            std::cmp::Ordering::Equal => Variance::Match,
            std::cmp::Ordering::Greater => Variance::Over,
            std::cmp::Ordering::Less => Variance::Short,
        }
    }

    pub fn is_discrepancy(&self) -> bool {
        !matches!(self, Variance::Match)
    }
}

/// True when `next` is a legal target for a stage advance from `current`.
///
/// Advances are strictly consecutive and only reach the recount stages;
/// entering stage 1 goes through the full reset instead.
pub fn is_valid_stage_advance(current: i16, next: i16) -> bool {
    (STAGE_FIRST_RECOUNT..=STAGE_MAX).contains(&next) && next == current + 1
}

/// True when `stage` requires recount-list membership for counting.
pub fn stage_requires_recount_list(stage: i16) -> bool {
    stage >= STAGE_FIRST_RECOUNT
}

/// Derive the recount list for the next stage from the previous stage's
/// counted totals.
///
/// Items whose summed count disagrees with the system quantity (missing from
/// the master counts as 0) go on the list. Items never counted in the
/// previous stage are not added.
pub fn derive_recount_list<F>(counted_totals: &BTreeMap<String, i64>, system_qty: F) -> BTreeSet<String>
where
    F: Fn(&str) -> Option<i64>,
{
    counted_totals
        .iter()
        .filter(|(code, total)| {
            Variance::classify(**total, system_qty(code).unwrap_or(0)).is_discrepancy()
        })
        .map(|(code, _)| code.clone())
        .collect()
}
