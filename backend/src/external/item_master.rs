//! Item master capability
//!
//! Loads the authoritative item master CSV into an immutable in-memory
//! lookup. A reload replaces the whole value under a reader-writer lock;
//! the loaded master is never mutated in place.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::Deserialize;

use shared::models::{AbcClass, MasterItem};
use shared::validation::normalize_item_code;

use crate::error::{AppError, AppResult};

/// One CSV row of the item master. The file is produced by the host ERP and
/// arrives with either English or Spanish headers.
#[derive(Debug, Deserialize)]
struct MasterRecord {
    #[serde(alias = "codigo")]
    item_code: String,

    #[serde(alias = "descripcion", default)]
    description: String,

    #[serde(alias = "cantidad", default)]
    system_qty: i64,

    #[serde(alias = "clase_abc", default)]
    abc_class: Option<String>,

    #[serde(alias = "ubicacion", default)]
    bin_location: Option<String>,
}

/// Immutable in-memory view of the item master
#[derive(Debug, Default)]
pub struct ItemMaster {
    items: HashMap<String, MasterItem>,
}

impl ItemMaster {
    /// Load the item master from a CSV file on disk
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            AppError::ItemMaster(format!(
                "cannot open {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_csv_reader(file)
    }

    /// Load the item master from any CSV source
    pub fn from_csv_reader<R: Read>(reader: R) -> AppResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut items = HashMap::new();
        for result in csv_reader.deserialize::<MasterRecord>() {
            let record = result.map_err(|e| AppError::ItemMaster(e.to_string()))?;
            let code = normalize_item_code(&record.item_code);
            if code.is_empty() {
                continue;
            }
            let bin_location = record
                .bin_location
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty());
            // Last row wins on duplicate codes
            items.insert(
                code.clone(),
                MasterItem {
                    code,
                    description: record.description.trim().to_string(),
                    system_qty: record.system_qty,
                    abc_class: record.abc_class.as_deref().and_then(AbcClass::parse),
                    bin_location,
                },
            );
        }

        Ok(Self { items })
    }

    /// Lookup an item by normalized code
    pub fn get(&self, code: &str) -> Option<&MasterItem> {
        self.items.get(code)
    }

    /// System quantity for an item, if the item exists
    pub fn qty(&self, code: &str) -> Option<i64> {
        self.items.get(code).map(|i| i.system_qty)
    }

    /// ABC rotation class for an item
    pub fn abc_class(&self, code: &str) -> Option<AbcClass> {
        self.items.get(code).and_then(|i| i.abc_class)
    }

    /// Primary bin for an item
    pub fn bin_of(&self, code: &str) -> Option<&str> {
        self.items.get(code).and_then(|i| i.bin_location.as_deref())
    }

    /// Codes of items with a positive system quantity
    pub fn items_with_stock(&self) -> Vec<&str> {
        self.items
            .values()
            .filter(|i| i.has_stock())
            .map(|i| i.code.as_str())
            .collect()
    }

    /// Distinct bins among items with a positive system quantity
    pub fn locations_with_stock(&self) -> i64 {
        self.items
            .values()
            .filter(|i| i.has_stock())
            .filter_map(|i| i.bin_location.as_deref())
            .collect::<HashSet<_>>()
            .len() as i64
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Shared handle to the current item master.
///
/// Readers take a cheap snapshot `Arc`; a reload swaps the inner value
/// wholesale. The read guard is never held across an await point.
#[derive(Clone, Default)]
pub struct SharedItemMaster {
    inner: Arc<RwLock<Arc<ItemMaster>>>,
}

impl SharedItemMaster {
    pub fn new(master: ItemMaster) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(master))),
        }
    }

    /// Snapshot of the current master
    pub fn current(&self) -> Arc<ItemMaster> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the master with a freshly loaded value
    pub fn replace(&self, master: ItemMaster) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(master);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
item_code,description,system_qty,abc_class,bin_location
ITEM-A,Tornillo 3mm,10,A,A-01
ITEM-B,Tuerca 5mm,4,B,B-02
ITEM-C,Arandela,0,C,C-03
ITEM-D,Sin ubicacion,7,,
";

    const SPANISH_CSV: &str = "\
codigo,descripcion,cantidad,clase_abc,ubicacion
item-a,Tornillo 3mm,10,A,A-01
";

    #[test]
    fn test_load_and_lookup() {
        let master = ItemMaster::from_csv_reader(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(master.len(), 4);
        assert_eq!(master.qty("ITEM-A"), Some(10));
        assert_eq!(master.qty("ITEM-X"), None);
        assert_eq!(master.bin_of("ITEM-B"), Some("B-02"));
        assert_eq!(master.bin_of("ITEM-D"), None);
        assert_eq!(master.abc_class("ITEM-C"), Some(shared::models::AbcClass::C));
    }

    #[test]
    fn test_spanish_headers_and_code_normalization() {
        let master = ItemMaster::from_csv_reader(SPANISH_CSV.as_bytes()).unwrap();
        assert_eq!(master.qty("ITEM-A"), Some(10));
    }

    #[test]
    fn test_items_with_stock_excludes_zero_qty() {
        let master = ItemMaster::from_csv_reader(SAMPLE_CSV.as_bytes()).unwrap();
        let mut stocked = master.items_with_stock();
        stocked.sort_unstable();
        assert_eq!(stocked, vec!["ITEM-A", "ITEM-B", "ITEM-D"]);
    }

    #[test]
    fn test_locations_with_stock_ignores_binless_items() {
        let master = ItemMaster::from_csv_reader(SAMPLE_CSV.as_bytes()).unwrap();
        // ITEM-A and ITEM-B have bins and stock; ITEM-C has no stock,
        // ITEM-D has no bin.
        assert_eq!(master.locations_with_stock(), 2);
    }

    #[test]
    fn test_duplicate_codes_last_row_wins() {
        let csv = "\
item_code,description,system_qty,abc_class,bin_location
DUP-1,Primera,1,A,A-01
DUP-1,Segunda,9,B,B-02
";
        let master = ItemMaster::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(master.len(), 1);
        assert_eq!(master.qty("DUP-1"), Some(9));
    }

    #[test]
    fn test_shared_master_replace() {
        let shared_master = SharedItemMaster::new(
            ItemMaster::from_csv_reader(SAMPLE_CSV.as_bytes()).unwrap(),
        );
        let before = shared_master.current();
        assert_eq!(before.len(), 4);

        shared_master.replace(ItemMaster::from_csv_reader(SPANISH_CSV.as_bytes()).unwrap());
        assert_eq!(shared_master.current().len(), 1);
        // Old snapshots stay valid
        assert_eq!(before.len(), 4);
    }
}
