//! Cycle-count session models

use serde::{Deserialize, Serialize};

/// Lifecycle of a count session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(SessionStatus::InProgress),
            "completed" => Some(SessionStatus::Completed),
            _ => None,
        }
    }
}

/// Per-session state of a warehouse location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    Open,
    Closed,
}

impl LocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationStatus::Open => "open",
            LocationStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(LocationStatus::Open),
            "closed" => Some(LocationStatus::Closed),
            _ => None,
        }
    }
}

/// What an operator sees when asked to count an item.
///
/// Deliberately excludes the system quantity: counts are blind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub item_code: String,
    pub description: String,
    pub bin_location: String,
}

/// Placeholder description for items absent from the master (stage 1 only)
pub const UNKNOWN_ITEM_DESCRIPTION: &str = "ITEM NO ENCONTRADO";

/// Placeholder bin for items absent from the master
pub const UNKNOWN_ITEM_BIN: &str = "N/A";

impl ItemSnapshot {
    /// Snapshot for an item found in the master
    pub fn found(item_code: &str, description: &str, bin_location: Option<&str>) -> Self {
        Self {
            item_code: item_code.to_string(),
            description: description.to_string(),
            bin_location: bin_location.unwrap_or(UNKNOWN_ITEM_BIN).to_string(),
        }
    }

    /// Snapshot for an item not present in the master
    pub fn unknown(item_code: &str) -> Self {
        Self {
            item_code: item_code.to_string(),
            description: UNKNOWN_ITEM_DESCRIPTION.to_string(),
            bin_location: UNKNOWN_ITEM_BIN.to_string(),
        }
    }
}
