//! Item master models
//!
//! The item master is the authoritative flat file describing every item the
//! distribution center tracks: system quantity, ABC rotation class, and the
//! primary bin where the item is slotted.

use serde::{Deserialize, Serialize};

/// ABC rotation class of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl AbcClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbcClass::A => "A",
            AbcClass::B => "B",
            AbcClass::C => "C",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "A" | "a" => Some(AbcClass::A),
            "B" | "b" => Some(AbcClass::B),
            "C" | "c" => Some(AbcClass::C),
            _ => None,
        }
    }
}

/// One row of the item master
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterItem {
    pub code: String,
    pub description: String,
    pub system_qty: i64,
    pub abc_class: Option<AbcClass>,
    pub bin_location: Option<String>,
}

impl MasterItem {
    pub fn has_stock(&self) -> bool {
        self.system_qty > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abc_class_parse() {
        assert_eq!(AbcClass::parse("A"), Some(AbcClass::A));
        assert_eq!(AbcClass::parse(" b "), Some(AbcClass::B));
        assert_eq!(AbcClass::parse("D"), None);
        assert_eq!(AbcClass::parse(""), None);
    }

    #[test]
    fn test_has_stock() {
        let item = MasterItem {
            code: "I1".into(),
            description: "Caja".into(),
            system_qty: 0,
            abc_class: None,
            bin_location: None,
        };
        assert!(!item.has_stock());
    }
}
