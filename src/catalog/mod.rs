//! Menu catalog access and item-mention matching
//!
//! The catalog itself is owned by an external collaborator; the core only reads
//! snapshots through [`CatalogProvider`]. [`StaticCatalog`] is an in-memory
//! provider loaded from YAML, used by the CLI and the tests.

mod matcher;
mod suggest;

pub use matcher::{CatalogMatcher, MatchRule, MatchSpan, Mention};
pub use suggest::Suggestion;

use std::collections::HashSet;
use std::path::Path;

use comanda_types::{MenuItem, MenuItemId};
use serde::Deserialize;

use crate::error::CatalogError;

// =============================================================================
// Provider trait
// =============================================================================

/// Read-only view of the restaurant menu.
pub trait CatalogProvider: Send + Sync {
    /// Items currently orderable. An empty list is valid and yields no mentions.
    fn list_available_items(&self) -> Vec<MenuItem>;

    /// Look up an item by id, including unavailable ones.
    fn get_item(&self, id: MenuItemId) -> Option<MenuItem> {
        self.list_available_items().into_iter().find(|i| i.id == id)
    }
}

// =============================================================================
// Static catalog
// =============================================================================

#[derive(Debug, Deserialize)]
struct MenuFile {
    items: Vec<MenuItem>,
}

/// Fixed in-memory menu.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    items: Vec<MenuItem>,
}

impl StaticCatalog {
    /// Build from items, rejecting duplicate ids.
    pub fn from_items(items: Vec<MenuItem>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.id) {
                return Err(CatalogError::DuplicateId(item.id.0));
            }
        }
        Ok(Self { items })
    }

    /// Load from a YAML file with a top-level `items:` list
    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::load_from_str(&content)
    }

    /// Load from a YAML string
    pub fn load_from_str(yaml: &str) -> Result<Self, CatalogError> {
        let file: MenuFile =
            serde_yaml::from_str(yaml).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_items(file.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CatalogProvider for StaticCatalog {
    fn list_available_items(&self) -> Vec<MenuItem> {
        self.items.iter().filter(|i| i.available).cloned().collect()
    }

    fn get_item(&self, id: MenuItemId) -> Option<MenuItem> {
        self.items.iter().find(|i| i.id == id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    const MENU: &str = r#"
items:
  - id: 1
    name: Bruschetta
    price: "18.90"
    category: Entradas
    preparation_minutes: 10
  - id: 6
    name: Coca-Cola 350ml
    price: "6.90"
    category: Bebidas
    available: false
"#;

    #[test]
    fn loads_menu_and_filters_unavailable() {
        let catalog = StaticCatalog::load_from_str(MENU).unwrap();
        assert_eq!(catalog.len(), 2);

        let available = catalog.list_available_items();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].name, "Bruschetta");
        assert_eq!(available[0].price, Decimal::new(1890, 2));

        let coke = catalog.get_item(MenuItemId(6)).unwrap();
        assert!(!coke.available);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let items = vec![
            MenuItem::new(1, "A", Decimal::ONE, "X"),
            MenuItem::new(1, "B", Decimal::ONE, "X"),
        ];
        assert!(matches!(
            StaticCatalog::from_items(items),
            Err(CatalogError::DuplicateId(1))
        ));
    }

    #[test]
    fn parse_error_is_reported() {
        assert!(matches!(
            StaticCatalog::load_from_str("items: 3"),
            Err(CatalogError::Parse(_))
        ));
    }
}
