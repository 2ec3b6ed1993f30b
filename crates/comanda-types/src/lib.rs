//! Shared Types for comanda
//!
//! Records that cross the boundary between the ordering core and the
//! collaborators around it (catalog storage, chat transports, order storage).
//!
//! ## Rules
//!
//! 1. Catalog records are immutable snapshots - the core only reads them
//! 2. Identifiers are newtypes, serialized transparently
//! 3. Money is `rust_decimal::Decimal` with two decimal places

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// CATALOG
// ============================================================================

/// Identity of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuItemId(pub i64);

impl fmt::Display for MenuItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A menu entry as published by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Unit price, fixed-point with two decimals
    pub price: Decimal,
    pub category: String,
    #[serde(default = "default_available")]
    pub available: bool,
    /// Kitchen preparation time, when the catalog knows it
    #[serde(default)]
    pub preparation_minutes: Option<u32>,
}

fn default_available() -> bool {
    true
}

impl MenuItem {
    /// Build an available item with no description or preparation time.
    pub fn new(id: i64, name: impl Into<String>, price: Decimal, category: impl Into<String>) -> Self {
        Self {
            id: MenuItemId(id),
            name: name.into(),
            description: String::new(),
            price: price.round_dp(2),
            category: category.into(),
            available: true,
            preparation_minutes: None,
        }
    }

    pub fn with_preparation_minutes(mut self, minutes: u32) -> Self {
        self.preparation_minutes = Some(minutes);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

// ============================================================================
// CONVERSATION
// ============================================================================

/// Stable identifier of one customer's chat thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationKey(pub String);

impl ConversationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Chat platform a conversation arrives from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Telegram,
    Whatsapp,
    Web,
    Other(String),
}

impl Platform {
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Telegram => "telegram",
            Platform::Whatsapp => "whatsapp",
            Platform::Web => "web",
            Platform::Other(name) => name,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Customer identity as reported by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl CustomerInfo {
    /// Overwrite the fields that `other` knows, keep the rest.
    pub fn merge_from(&mut self, other: &CustomerInfo) {
        if let Some(name) = other.name.as_ref().filter(|n| !n.trim().is_empty()) {
            self.name = Some(name.clone());
        }
        if let Some(phone) = other.phone.as_ref().filter(|p| !p.trim().is_empty()) {
            self.phone = Some(phone.clone());
        }
    }
}

// ============================================================================
// ORDER STORAGE
// ============================================================================

/// Identifier assigned by order storage once an order is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_item_defaults_when_deserialized() {
        let yaml = r#"
id: 8
name: Caipirinha
price: "14.90"
category: Bebidas
"#;
        let item: MenuItem = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(item.id, MenuItemId(8));
        assert!(item.available);
        assert_eq!(item.preparation_minutes, None);
        assert_eq!(item.price, Decimal::new(1490, 2));
    }

    #[test]
    fn conversation_key_is_transparent() {
        let key = ConversationKey::new("tg:42");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"tg:42\"");
    }

    #[test]
    fn customer_merge_keeps_known_fields() {
        let mut info = CustomerInfo {
            name: Some("Ana".to_string()),
            phone: None,
        };
        info.merge_from(&CustomerInfo {
            name: Some("  ".to_string()),
            phone: Some("+55 11 90000-0000".to_string()),
        });
        assert_eq!(info.name.as_deref(), Some("Ana"));
        assert_eq!(info.phone.as_deref(), Some("+55 11 90000-0000"));
    }
}
