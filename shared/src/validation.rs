//! Validation utilities for the Warehouse Operations Backend

use crate::models::{STAGE_FULL_COUNT, STAGE_INACTIVE, STAGE_MAX};

// ============================================================================
// Counting Validations
// ============================================================================

/// Validate a counted quantity. Zero is legal (the operator visited the
/// location and found nothing); negatives are not.
pub fn validate_counted_qty(qty: i64) -> Result<(), &'static str> {
    if qty < 0 {
        return Err("Counted quantity cannot be negative");
    }
    Ok(())
}

/// Validate that a stage value is one of the four counting stages.
pub fn validate_counting_stage(stage: i16) -> Result<(), &'static str> {
    if !(STAGE_FULL_COUNT..=STAGE_MAX).contains(&stage) {
        return Err("Stage must be between 1 and 4");
    }
    Ok(())
}

/// Validate a stored stage-state value (0 = no active cycle).
pub fn validate_stage_state(stage: i16) -> Result<(), &'static str> {
    if !(STAGE_INACTIVE..=STAGE_MAX).contains(&stage) {
        return Err("Stage state must be between 0 and 4");
    }
    Ok(())
}

/// Normalize an item code as scanned or typed by an operator.
pub fn normalize_item_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Normalize a warehouse location code.
pub fn normalize_location_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Validate a normalized item or location code is non-empty and scannable.
pub fn validate_code(code: &str) -> Result<(), &'static str> {
    if code.is_empty() {
        return Err("Code cannot be empty");
    }
    if code.len() > 64 {
        return Err("Code is too long");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_counted_qty() {
        assert!(validate_counted_qty(0).is_ok());
        assert!(validate_counted_qty(150).is_ok());
        assert!(validate_counted_qty(-1).is_err());
    }

    #[test]
    fn test_validate_counting_stage() {
        assert!(validate_counting_stage(1).is_ok());
        assert!(validate_counting_stage(4).is_ok());
        assert!(validate_counting_stage(0).is_err());
        assert!(validate_counting_stage(5).is_err());
    }

    #[test]
    fn test_validate_stage_state() {
        assert!(validate_stage_state(0).is_ok());
        assert!(validate_stage_state(4).is_ok());
        assert!(validate_stage_state(-1).is_err());
        assert!(validate_stage_state(5).is_err());
    }

    #[test]
    fn test_normalize_item_code() {
        assert_eq!(normalize_item_code("  abc-01 "), "ABC-01");
        assert_eq!(normalize_item_code("XYZ-404"), "XYZ-404");
    }

    #[test]
    fn test_validate_code() {
        assert!(validate_code("A-01").is_ok());
        assert!(validate_code("").is_err());
        assert!(validate_code(&"X".repeat(65)).is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_normalized_codes_are_trimmed_uppercase(code in "[a-zA-Z0-9 -]{0,32}") {
                let normalized = normalize_item_code(&code);
                prop_assert_eq!(normalized.trim(), normalized.as_str());
                prop_assert!(!normalized.chars().any(|c| c.is_lowercase()));
            }

            #[test]
            fn prop_qty_validation_matches_sign(qty in proptest::num::i64::ANY) {
                prop_assert_eq!(validate_counted_qty(qty).is_ok(), qty >= 0);
            }
        }
    }
}
