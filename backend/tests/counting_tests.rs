//! Counting session tests
//!
//! Tests for the operator counting workflow including:
//! - Property 1: Single Active Session Per User
//! - Property 2: Closed-Location Immutability
//! - Property 3: Negative Quantity Rejection

use proptest::prelude::*;
use uuid::Uuid;

use shared::models::{stage_requires_recount_list, ItemSnapshot, LocationStatus, SessionStatus};
use shared::validation::{normalize_item_code, normalize_location_code, validate_counted_qty};

// ============================================================================
// Session store model
// ============================================================================

/// In-memory model of the count_sessions table, mirroring the transactional
/// discipline of StartSession: complete any prior in-progress session, then
/// insert the new one.
#[derive(Debug, Default)]
struct SessionModel {
    sessions: Vec<ModelSession>,
    next_id: i64,
}

#[derive(Debug, Clone)]
struct ModelSession {
    id: i64,
    user_id: Uuid,
    status: SessionStatus,
    inventory_stage: i16,
}

impl SessionModel {
    fn new() -> Self {
        Self {
            sessions: Vec::new(),
            next_id: 1,
        }
    }

    fn start_session(&mut self, user_id: Uuid, stage: i16) -> Result<i64, &'static str> {
        if stage < 1 {
            return Err("StageInactive");
        }
        for session in &mut self.sessions {
            if session.user_id == user_id && session.status == SessionStatus::InProgress {
                session.status = SessionStatus::Completed;
            }
        }
        let id = self.next_id;
        self.next_id += 1;
        self.sessions.push(ModelSession {
            id,
            user_id,
            status: SessionStatus::InProgress,
            inventory_stage: stage,
        });
        Ok(id)
    }

    fn close_session(&mut self, id: i64, user_id: Uuid) -> Result<(), &'static str> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or("NotFound")?;
        if session.user_id != user_id {
            return Err("Forbidden");
        }
        session.status = SessionStatus::Completed;
        Ok(())
    }

    fn active_session(&self, user_id: Uuid) -> Option<&ModelSession> {
        self.sessions
            .iter()
            .find(|s| s.user_id == user_id && s.status == SessionStatus::InProgress)
    }

    fn active_count(&self, user_id: Uuid) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.status == SessionStatus::InProgress)
            .count()
    }
}

// ============================================================================
// Location closure model
// ============================================================================

/// Model of session_locations plus the closed-location check of SaveCount
#[derive(Debug, Default)]
struct LocationModel {
    locations: Vec<(String, LocationStatus)>,
    accepted_counts: Vec<(String, i64)>,
}

impl LocationModel {
    fn close(&mut self, location: &str) {
        match self.locations.iter_mut().find(|(code, _)| code == location) {
            Some(entry) => entry.1 = LocationStatus::Closed,
            None => self
                .locations
                .push((location.to_string(), LocationStatus::Closed)),
        }
    }

    fn reopen(&mut self, location: &str) -> Result<(), &'static str> {
        match self.locations.iter_mut().find(|(code, _)| code == location) {
            Some(entry) if entry.1 == LocationStatus::Closed => {
                entry.1 = LocationStatus::Open;
                Ok(())
            }
            _ => Err("NotClosed"),
        }
    }

    fn is_closed(&self, location: &str) -> bool {
        self.locations
            .iter()
            .any(|(code, status)| code == location && *status == LocationStatus::Closed)
    }

    fn save_count(&mut self, location: &str, qty: i64) -> Result<(), &'static str> {
        validate_counted_qty(qty)?;
        if self.is_closed(location) {
            return Err("LocationClosed");
        }
        self.accepted_counts.push((location.to_string(), qty));
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Scenario: starting a second session completes the first
    #[test]
    fn test_single_active_session_rule() {
        let carol = Uuid::new_v4();
        let mut model = SessionModel::new();

        let first = model.start_session(carol, 1).unwrap();
        let second = model.start_session(carol, 1).unwrap();

        assert_ne!(first, second);
        assert_eq!(model.active_count(carol), 1);
        assert_eq!(model.active_session(carol).unwrap().id, second);

        let completed = model.sessions.iter().find(|s| s.id == first).unwrap();
        assert_eq!(completed.status, SessionStatus::Completed);
    }

    /// Sessions cannot start while no cycle is open
    #[test]
    fn test_start_session_requires_active_stage() {
        let alice = Uuid::new_v4();
        let mut model = SessionModel::new();
        assert_eq!(model.start_session(alice, 0), Err("StageInactive"));
        assert!(model.start_session(alice, 1).is_ok());
    }

    /// Closing another user's session is forbidden
    #[test]
    fn test_close_session_ownership() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut model = SessionModel::new();

        let id = model.start_session(alice, 1).unwrap();
        assert_eq!(model.close_session(id, bob), Err("Forbidden"));
        assert!(model.close_session(id, alice).is_ok());
        // Re-closing a completed session stays a success
        assert!(model.close_session(id, alice).is_ok());
    }

    /// A session keeps the stage it was opened under
    #[test]
    fn test_session_stage_pinning() {
        let alice = Uuid::new_v4();
        let mut model = SessionModel::new();

        let id = model.start_session(alice, 1).unwrap();
        // The cycle advances while the session is open
        let pinned = model
            .sessions
            .iter()
            .find(|s| s.id == id)
            .unwrap()
            .inventory_stage;
        assert_eq!(pinned, 1);

        let next = model.start_session(alice, 2).unwrap();
        assert_eq!(
            model
                .sessions
                .iter()
                .find(|s| s.id == next)
                .unwrap()
                .inventory_stage,
            2
        );
    }

    /// Scenario: closed-location immutability with reopen
    #[test]
    fn test_closed_location_rejects_counts() {
        let mut model = LocationModel::default();

        model.save_count("A-01", 5).unwrap();
        model.save_count("A-01", 2).unwrap();
        model.close("A-01");

        assert_eq!(model.save_count("A-01", 1), Err("LocationClosed"));

        model.reopen("A-01").unwrap();
        model.save_count("A-01", 1).unwrap();

        assert_eq!(model.accepted_counts.len(), 3);
    }

    /// Reopening an open or untracked location fails
    #[test]
    fn test_reopen_requires_closed_entry() {
        let mut model = LocationModel::default();
        assert_eq!(model.reopen("B-02"), Err("NotClosed"));

        model.close("B-02");
        model.reopen("B-02").unwrap();
        assert_eq!(model.reopen("B-02"), Err("NotClosed"));
    }

    /// Closing a location twice stays closed
    #[test]
    fn test_close_location_idempotent() {
        let mut model = LocationModel::default();
        model.close("C-07");
        model.close("C-07");
        assert!(model.is_closed("C-07"));
        assert_eq!(model.locations.len(), 1);
    }

    /// Scenario: stage-1 blind count of an unknown item
    #[test]
    fn test_stage1_unknown_item_snapshot() {
        let snapshot = ItemSnapshot::unknown("XYZ-404");
        assert_eq!(
            snapshot,
            ItemSnapshot {
                item_code: "XYZ-404".to_string(),
                description: "ITEM NO ENCONTRADO".to_string(),
                bin_location: "N/A".to_string(),
            }
        );
    }

    /// Stage 1 needs no recount list; stages 2-4 do
    #[test]
    fn test_stage_gate_threshold() {
        assert!(!stage_requires_recount_list(1));
        for stage in 2..=4 {
            assert!(stage_requires_recount_list(stage));
        }
    }

    /// Zero quantities are legal counts
    #[test]
    fn test_zero_count_accepted() {
        let mut model = LocationModel::default();
        assert!(model.save_count("D-01", 0).is_ok());
    }

    /// Counts of the same item and location accumulate by sum
    #[test]
    fn test_counts_accumulate() {
        let mut model = LocationModel::default();
        model.save_count("A-01", 5).unwrap();
        model.save_count("A-01", 2).unwrap();

        let total: i64 = model
            .accepted_counts
            .iter()
            .filter(|(code, _)| code == "A-01")
            .map(|(_, qty)| qty)
            .sum();
        assert_eq!(total, 7);
    }

    /// Operator input is normalized before hitting the store
    #[test]
    fn test_code_normalization() {
        assert_eq!(normalize_item_code(" itm-9 "), "ITM-9");
        assert_eq!(normalize_location_code("a-01"), "A-01");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// A pool of user ids so that sequences revisit the same users
    fn user_pool() -> Vec<Uuid> {
        (0..4).map(|_| Uuid::new_v4()).collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property 1: at most one in-progress session per user after any
        /// interleaving of starts and closes
        #[test]
        fn prop_single_active_session(ops in prop::collection::vec((0usize..4, 0u8..2), 1..60)) {
            let users = user_pool();
            let mut model = SessionModel::new();

            for (user_idx, op) in ops {
                let user = users[user_idx];
                match op {
                    0 => {
                        model.start_session(user, 1).unwrap();
                    }
                    _ => {
                        if let Some(id) = model.active_session(user).map(|s| s.id) {
                            model.close_session(id, user).unwrap();
                        }
                    }
                }
                for u in &users {
                    prop_assert!(model.active_count(*u) <= 1);
                }
            }
        }

        /// Property 3: negative quantities are always rejected
        #[test]
        fn prop_negative_qty_rejected(qty in i64::MIN..0) {
            prop_assert!(validate_counted_qty(qty).is_err());
        }

        /// Non-negative quantities are always accepted
        #[test]
        fn prop_non_negative_qty_accepted(qty in 0i64..=i64::MAX) {
            prop_assert!(validate_counted_qty(qty).is_ok());
        }

        /// Property 2: no count is ever accepted at a location that was
        /// closed at acceptance time
        #[test]
        fn prop_no_counts_on_closed_locations(
            ops in prop::collection::vec((0usize..3, 0u8..3, 0i64..100), 1..80)
        ) {
            let locations = ["A-01", "B-02", "C-03"];
            let mut model = LocationModel::default();

            for (loc_idx, op, qty) in ops {
                let location = locations[loc_idx];
                match op {
                    0 => model.close(location),
                    1 => {
                        let _ = model.reopen(location);
                    }
                    _ => {
                        let accepted = model.save_count(location, qty);
                        if model.is_closed(location) {
                            prop_assert_eq!(accepted, Err("LocationClosed"));
                        } else {
                            prop_assert!(accepted.is_ok());
                        }
                    }
                }
            }
        }

        /// Normalization is idempotent
        #[test]
        fn prop_normalization_idempotent(code in "[a-zA-Z0-9 -]{0,20}") {
            let once = normalize_item_code(&code);
            let twice = normalize_item_code(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
